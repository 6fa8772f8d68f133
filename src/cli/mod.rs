use crate::identity::{Identity, SessionSnapshot};
use crate::navigation::{Decision, Navigation, Redirect};
use crate::storage::credential_prefix;

// Render the session as a two-column ASCII table.
pub fn render_session(snap: &SessionSnapshot) -> String {
    let credential = if snap.credential.is_empty() {
        "<none>".to_string()
    } else {
        format!("{}…", credential_prefix(&snap.credential))
    };
    let mut rows = vec![
        vec!["logged_in".to_string(), (!snap.credential.is_empty()).to_string()],
        vec!["credential".to_string(), credential],
    ];
    rows.extend(identity_rows(&snap.identity));
    if !snap.last_error.is_empty() {
        rows.push(vec!["last_error".to_string(), snap.last_error.clone()]);
    }
    render_table(&["field".to_string(), "value".to_string()], &rows)
}

pub fn render_identity(id: &Identity) -> String {
    render_table(&["field".to_string(), "value".to_string()], &identity_rows(id))
}

pub fn render_navigation(path: &str, nav: &Navigation) -> String {
    let outcome = match nav.decision {
        Decision::Allow => "allow".to_string(),
        Decision::DenyTo(Redirect::Login) => format!("deny -> login ({})", nav.redirect_path.as_deref().unwrap_or("?")),
        Decision::DenyTo(Redirect::Default) => format!("deny -> default ({})", nav.redirect_path.as_deref().unwrap_or("?")),
    };
    let route = nav.route.as_ref().and_then(|r| r.name.clone()).unwrap_or_else(|| "-".to_string());
    format!("{} [{}]: {}\ntitle: {}", path, route, outcome, nav.title)
}

fn identity_rows(id: &Identity) -> Vec<Vec<String>> {
    vec![
        vec!["id".to_string(), id.id.clone()],
        vec!["username".to_string(), id.username.clone()],
        vec!["email".to_string(), id.email.clone()],
        vec!["full_name".to_string(), id.full_name.clone()],
        vec!["is_admin".to_string(), id.is_admin.to_string()],
    ]
}

fn render_table(header: &[String], rows: &[Vec<String>]) -> String {
    let max_col_width: usize = 60;
    let mut widths: Vec<usize> = header.iter().map(|s| display_len(s).min(max_col_width)).collect();
    for r in rows {
        for (i, cell) in r.iter().enumerate().take(widths.len()) {
            let w = display_len(cell);
            if w > widths[i] { widths[i] = w.min(max_col_width); }
        }
    }
    let sep = build_separator(&widths);
    let mut out = vec![sep.clone(), build_row(header, &widths), sep.clone()];
    out.extend(rows.iter().map(|r| build_row(r, &widths)));
    out.push(sep);
    out.join("\n")
}

fn display_len(s: &str) -> usize { s.chars().count() }

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::from("+");
    for w in widths {
        s.push_str(&"-".repeat(*w + 2));
        s.push('+');
    }
    s
}

fn build_row(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::from("|");
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).cloned().unwrap_or_default();
        let text = truncate(&cell, *w);
        s.push(' ');
        s.push_str(&text);
        s.push_str(&" ".repeat(w.saturating_sub(display_len(&text))));
        s.push_str(" |");
    }
    s
}

fn truncate(s: &str, max: usize) -> String {
    if display_len(s) <= max { return s.to_string(); }
    if max <= 1 { return "…".to_string(); }
    s.chars().take(max - 1).collect::<String>() + "…"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_table_hides_most_of_credential() {
        let snap = SessionSnapshot {
            credential: "eyJhbGciOiJIUzI1NiJ9.payload.sig".into(),
            identity: Identity { id: "1".into(), username: "alice".into(), ..Default::default() },
            ..Default::default()
        };
        let out = render_session(&snap);
        assert!(out.contains("| credential | eyJhbGciOi… "));
        assert!(!out.contains("payload"));
        assert!(out.contains("| username   | alice"));
    }

    #[test]
    fn truncation_marks_cut() {
        assert_eq!(truncate("abcdef", 4), "abc…");
        assert_eq!(truncate("ab", 4), "ab");
    }
}
