use axum::Form;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};

use tessera_abi::backend::ModelParams;
use tessera_core::settings::schema::{FIELD_SELECTED_MODEL, FIELD_SELECTED_PROMPT};
use tessera_core::{
    PatternStore, RawFields, SessionBridge, SessionId, SessionState, SettingsError, resolve,
};

use super::cookie::{attach, session_from};
use crate::app_state::AppState;
use crate::error::WebError;
use crate::model::list_available_models;
use crate::view::{NO_MODEL, PageView};

pub(super) async fn show(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    let (id, fresh) = session_from(&headers);
    let page = tokio::task::spawn_blocking(move || {
        let patterns = PatternStore::discover(&state.config.patterns_dir)?;
        let session = SessionBridge::new(state.sessions.as_ref(), id).load();
        Ok::<_, WebError>(render_page(&state, &patterns, &session, None))
    })
    .await??;
    Ok(attach(Html(page).into_response(), id, fresh))
}

pub(super) async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, WebError> {
    let (id, fresh) = session_from(&headers);
    let (status, page) =
        tokio::task::spawn_blocking(move || handle_submission(&state, id, pairs)).await??;
    Ok(attach((status, Html(page)).into_response(), id, fresh))
}

/// One form post: resolve settings, make sure the model is loaded, generate, log, persist.
fn handle_submission(
    state: &AppState,
    id: SessionId,
    pairs: Vec<(String, String)>,
) -> Result<(StatusCode, String), WebError> {
    let patterns = PatternStore::discover(&state.config.patterns_dir)?;
    let raw = RawFields::from_pairs(pairs);
    let bridge = SessionBridge::new(state.sessions.as_ref(), id);

    let Some(model_path) = raw
        .get(FIELD_SELECTED_MODEL)
        .filter(|m| !m.is_empty() && *m != NO_MODEL)
    else {
        tracing::warn!("[http] no model selected");
        state.log().notice("No model selected!");
        return Ok((StatusCode::OK, render_page(state, &patterns, &bridge.load(), None)));
    };

    let rejected = |e: SettingsError| {
        tracing::warn!("[http] rejected settings: {e}");
        Ok::<_, WebError>((
            StatusCode::UNPROCESSABLE_ENTITY,
            render_page(state, &patterns, &bridge.load(), Some(e.to_string())),
        ))
    };

    let (settings, selection) = match resolve(&raw, raw.get(FIELD_SELECTED_PROMPT), &patterns) {
        Ok(resolved) => resolved,
        Err(e) => return rejected(e),
    };
    let pattern_name = selection.selected_pattern_name.clone().unwrap_or_default();
    let Some(pattern) = patterns.get(&pattern_name) else {
        return rejected(SettingsError::UnknownPattern { name: pattern_name });
    };
    tracing::info!("[http] model={model_path} pattern={pattern_name} settings={settings:?}");

    if let Err(e) = bridge.save(&settings, &selection, Some(&pattern_name)) {
        tracing::warn!("[http] could not persist session {}: {e}", bridge.id());
    }

    let params = ModelParams {
        context_size: state.config.context_size,
        logits_all: selection.logits_all,
    };
    let outcome = {
        let mut model = state.model();
        model.ensure(model_path, &params);
        model.generate(&selection.prompt, pattern, &settings)
    };
    match outcome {
        Ok(outcome) => state.log().push(outcome),
        Err(e) => {
            tracing::error!("[http] generation failed: {e}");
            state.log().notice(format!("Generation failed: {e}"));
        }
    }

    Ok((StatusCode::OK, render_page(state, &patterns, &bridge.load(), None)))
}

fn render_page(
    state: &AppState,
    patterns: &PatternStore,
    session: &SessionState,
    banner: Option<String>,
) -> String {
    let models = list_available_models(&state.config.models_dir);
    let entries = state.log().recent().cloned().collect();
    let degraded = state.model().stub_reason().map(str::to_owned);
    PageView {
        models: &models,
        patterns: patterns.names().collect(),
        state: session,
        entries,
        banner,
        degraded,
    }
    .render()
}
