//! Critique stage: render the finished book, hand the bytes to the
//! critic agent, and record the verdict. Never writes a placeholder:
//! on failure the status says so and the error is kept for the UI.

use narra_core::models::session::CritiqueStatus;
use narra_core::models::tokens::Phase;
use narra_core::traits::RenderFormat;

use crate::services::Services;

pub fn run_critique_stage(services: &Services, session_id: &str) {
    let session = match services.sessions.load(session_id) {
        Ok(Some(session)) => session,
        Ok(None) => return,
        Err(err) => {
            tracing::warn!(session_id, error = %err, "critique stage could not load session");
            return;
        }
    };
    if session.book_chapters.is_empty() {
        return;
    }

    if let Err(err) =
        services
            .sessions
            .update_critique_status(session_id, CritiqueStatus::Running, None)
    {
        tracing::warn!(session_id, error = %err, "failed to mark critique running");
        return;
    }

    let result = render_and_critique(services, session_id);
    match result {
        Ok(score) => tracing::info!(session_id, score, "critique completed"),
        Err(message) => {
            tracing::warn!(session_id, error = %message, "critique failed");
            if let Err(err) = services.sessions.update_critique_status(
                session_id,
                CritiqueStatus::Failed,
                Some(&message),
            ) {
                tracing::warn!(session_id, error = %err, "failed to record critique failure");
            }
        }
    }
}

fn render_and_critique(services: &Services, session_id: &str) -> Result<f64, String> {
    let session = services
        .sessions
        .load(session_id)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("session {session_id} disappeared"))?;

    let pdf_bytes = services
        .renderer
        .render(&session, RenderFormat::Pdf)
        .map_err(|e| format!("PDF rendering failed: {e}"))?;
    if pdf_bytes.is_empty() {
        return Err("PDF renderer returned no bytes".to_string());
    }

    let title = session.current_title.as_deref().unwrap_or("Romanzo");
    let author = session.form_data.user_name.as_deref().unwrap_or("Autore");
    let timeout = services.timeout_ms(services.config.timeouts.critique_ms);

    let output = narra_agents::generate_critique(
        &services.gateway,
        &services.config.critic,
        title,
        author,
        &pdf_bytes,
        timeout,
    )
    .map_err(|e| e.to_string())?;

    let score = output.critique.score;
    services
        .sessions
        .update_critique(session_id, output.critique)
        .map_err(|e| e.to_string())?;
    services
        .sessions
        .update_token_usage(
            session_id,
            Phase::Critique,
            output.usage.input_tokens,
            output.usage.output_tokens,
            &output.usage.model,
        )
        .map_err(|e| e.to_string())?;
    Ok(score)
}
