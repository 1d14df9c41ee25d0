//! The single HTML page: form, settings pre-filled from the session, and the log.

use std::fmt::Write as _;

use tessera_core::settings::stop::join_form;
use tessera_core::{ConversationEntry, GenerationSettings, SessionState};

use crate::model::ModelEntry;

/// Form value for "no model".
pub const NO_MODEL: &str = "no_model";

pub struct PageView<'a> {
    pub models: &'a [ModelEntry],
    pub patterns: Vec<&'a str>,
    pub state: &'a SessionState,
    pub entries: Vec<ConversationEntry>,
    /// Shown above the form, e.g. a rejected setting.
    pub banner: Option<String>,
    /// Load failure behind the stub responder, while it answers.
    pub degraded: Option<String>,
}

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn opt<T: ToString>(v: Option<T>) -> String {
    v.map(|v| escape(&v.to_string())).unwrap_or_default()
}

fn selected(yes: bool) -> &'static str {
    if yes { " selected" } else { "" }
}

impl PageView<'_> {
    pub fn render(&self) -> String {
        let mut html = String::with_capacity(4096);
        html.push_str(HEAD);

        if let Some(banner) = &self.banner {
            let _ = write!(html, r#"<p class="banner">{}</p>"#, escape(banner));
        }
        if let Some(reason) = &self.degraded {
            let _ = write!(
                html,
                r#"<p class="degraded">Model unavailable, answering with the stub responder: {}</p>"#,
                escape(reason)
            );
        }

        html.push_str(r#"<form method="post" action="/prompts"><div class="card">"#);
        self.render_selects(&mut html);
        html.push_str(
            r#"<textarea name="prompt" rows="5" placeholder="Type your prompt..."></textarea>"#,
        );
        render_settings(&mut html, &self.state.settings, self.state.selection.logits_all);
        html.push_str(r#"<button type="submit">Generate</button></div></form>"#);

        html.push_str(r#"<section id="log">"#);
        for entry in &self.entries {
            render_entry(&mut html, entry);
        }
        html.push_str("</section></body></html>");
        html
    }

    fn render_selects(&self, html: &mut String) {
        let current_model = self.state.selection.selected_model_path.as_deref();
        html.push_str(r#"<label>Model <select name="selected_model">"#);
        let _ = write!(
            html,
            r#"<option value="{}"{}>-- no model --</option>"#,
            NO_MODEL,
            selected(current_model.is_none())
        );
        for m in self.models {
            let path = m.path.to_string_lossy();
            let _ = write!(
                html,
                r#"<option value="{}"{}>{} / {}</option>"#,
                escape(&path),
                selected(current_model == Some(path.as_ref())),
                escape(&m.family),
                escape(&m.name)
            );
        }
        html.push_str("</select></label>");

        let current_pattern = self.state.selected_pattern_name.as_deref();
        html.push_str(r#"<label>Pattern <select name="selected_prompt">"#);
        for name in &self.patterns {
            let _ = write!(
                html,
                r#"<option value="{0}"{1}>{0}</option>"#,
                escape(name),
                selected(current_pattern == Some(*name))
            );
        }
        html.push_str("</select></label>");
    }
}

fn render_settings(html: &mut String, s: &GenerationSettings, logits_all: bool) {
    html.push_str(r#"<fieldset class="settings"><legend>Settings</legend>"#);
    let numeric = [
        ("max_tokens", opt(s.max_tokens)),
        ("top_k", opt(s.top_k)),
        ("top_p", opt(s.top_p)),
        ("temperature", opt(s.temperature)),
        ("repeat_penalty", opt(s.repeat_penalty)),
        ("logprobs", opt(s.logprobs)),
    ];
    for (name, value) in numeric {
        let _ = write!(
            html,
            r#"<label>{name} <input name="{name}" value="{value}"></label>"#
        );
    }
    let _ = write!(
        html,
        r#"<label>stop_strings <input name="stop_strings" value="{}"></label>"#,
        escape(&join_form(s.stop_strings()))
    );
    let checked = |yes: bool| if yes { " checked" } else { "" };
    let _ = write!(
        html,
        r#"<label><input type="checkbox" name="logits_all" value="on"{}> logits_all</label>"#,
        checked(logits_all)
    );
    let _ = write!(
        html,
        r#"<label><input type="checkbox" name="debug" value="on"{}> debug</label>"#,
        checked(s.is_debug())
    );
    html.push_str("</fieldset>");
}

fn render_entry(html: &mut String, entry: &ConversationEntry) {
    match entry {
        ConversationEntry::Exchange { prompt, output } => {
            let _ = write!(
                html,
                r#"<article class="exchange"><p class="prompt">{}</p><p class="output">{}</p></article>"#,
                escape(prompt),
                escape(output)
            );
        }
        ConversationEntry::Debug {
            rendered_prompt,
            raw,
        } => {
            let raw = serde_json::to_string_pretty(raw).unwrap_or_else(|e| e.to_string());
            let _ = write!(
                html,
                r#"<article class="debug"><pre class="prompt">{}</pre><pre class="raw">{}</pre></article>"#,
                escape(rendered_prompt),
                escape(&raw)
            );
        }
        ConversationEntry::Notice { message } => {
            let _ = write!(html, r#"<p class="notice">{}</p>"#, escape(message));
        }
    }
}

const HEAD: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Tessera</title>
  <style>
    body { font-family: ui-sans-serif, system-ui, -apple-system, Segoe UI, Roboto, Arial; margin: 24px; }
    .card { border: 1px solid #e5e7eb; border-radius: 16px; padding: 16px; max-width: 720px; }
    textarea { width: 100%; margin: 12px 0; }
    .settings label { display: inline-block; margin: 4px 12px 4px 0; }
    .banner { background: #fef2f2; color: #991b1b; padding: 8px 12px; border-radius: 8px; max-width: 720px; }
    .notice { color: #6b7280; }
    .degraded { background: #fffbeb; color: #92400e; padding: 8px 12px; border-radius: 8px; max-width: 720px; }
    .exchange, .debug { border-bottom: 1px solid #f3f4f6; max-width: 720px; }
    .prompt { font-weight: 600; }
    pre { white-space: pre-wrap; }
  </style>
</head>
<body>
  <h1>Tessera</h1>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::RuntimeSelection;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape(r#"<b>"x" & 'y'</b>"#), "&lt;b&gt;&quot;x&quot; &amp; &#39;y&#39;&lt;/b&gt;");
    }

    #[test]
    fn page_prefills_from_session_state() {
        let state = SessionState {
            settings: GenerationSettings {
                top_k: Some(7),
                stop_strings: Some(vec!["\n".into(), "###".into()]),
                ..Default::default()
            },
            selection: RuntimeSelection {
                selected_model_path: None,
                ..Default::default()
            },
            selected_pattern_name: Some("qa".into()),
        };
        let page = PageView {
            models: &[],
            patterns: vec!["chat", "qa"],
            state: &state,
            entries: vec![ConversationEntry::Notice {
                message: "<hi>".into(),
            }],
            banner: None,
            degraded: None,
        }
        .render();

        assert!(page.contains(r#"<input name="top_k" value="7">"#));
        assert!(page.contains(r#"value="\n,###""#));
        assert!(page.contains(r#"<option value="qa" selected>qa</option>"#));
        assert!(page.contains(r#"<option value="no_model" selected>"#));
        assert!(page.contains("&lt;hi&gt;"));
        assert!(!page.contains(r#"class="degraded""#));
    }

    #[test]
    fn stub_mode_is_announced() {
        let state = SessionState::default();
        let page = PageView {
            models: &[],
            patterns: Vec::new(),
            state: &state,
            entries: Vec::new(),
            banner: None,
            degraded: Some("invalid model path: <m>".into()),
        }
        .render();
        assert!(page.contains(
            r#"<p class="degraded">Model unavailable, answering with the stub responder: invalid model path: &lt;m&gt;</p>"#
        ));
    }
}
