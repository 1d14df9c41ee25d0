//! Template Renderer: embeds user input into a pattern template.

/// Replaced with the user's input.
pub const PROMPT_MARKER: &str = "<PROMPT>";
/// Cut point where the model continues; rendered as nothing.
pub const RESPONSE_MARKER: &str = "<RESPONSE>";

/// Substitute `user_input` for every `<PROMPT>` in `template`, then drop every `<RESPONSE>`.
///
/// The `<PROMPT>` pass is a single pass over the template, so a `<PROMPT>`
/// inside `user_input` is copied verbatim and never substituted again. The
/// `<RESPONSE>` pass runs over the whole result until none is left, which also
/// covers markers brought in by the input or joined across a substitution site.
pub fn render(template: &str, user_input: &str) -> String {
    let mut out = template.replace(PROMPT_MARKER, user_input);
    while out.contains(RESPONSE_MARKER) {
        out = out.replace(RESPONSE_MARKER, "");
    }
    out
}
