use axum::extract::State;
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::instrument;

use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::extractors::form::AppForm;
use crate::state::AppState;
use crate::utils::notice;

/// Webhook messages are capped well below the usual 2000 character limit.
const MAX_REPORT_CHARS: usize = 1800;

#[derive(Deserialize)]
pub struct BugReportForm {
    #[serde(default)]
    pub description: String,
}

/// Forward a bug report to the configured webhook. Never fails the request:
/// any delivery problem becomes a notice.
#[instrument(skip(state, auth_user, jar, form), fields(user_id = auth_user.id()))]
pub async fn report_bug(
    auth_user: AuthUser,
    State(state): State<AppState>,
    jar: CookieJar,
    AppForm(form): AppForm<BugReportForm>,
) -> Result<Response, AppError> {
    let description = form.description.trim();
    if description.is_empty() {
        return Ok(notice::redirect(jar, "Bug report cannot be empty.", "/"));
    }

    let Some(webhook_url) = state.config.report.webhook_url.as_deref() else {
        tracing::warn!("Bug report dropped: no webhook configured");
        return Ok(notice::redirect(jar, "Could not send bug report.", "/"));
    };

    let description: String = description.chars().take(MAX_REPORT_CHARS).collect();
    let payload = serde_json::json!({
        "content": format!(
            "Bug report from {} ({}):\n{}",
            auth_user.user.username, auth_user.user.external_id, description
        ),
    });

    let sent = state
        .http
        .post(webhook_url)
        .json(&payload)
        .send()
        .await
        .and_then(|response| response.error_for_status());

    match sent {
        Ok(_) => Ok(notice::redirect(jar, "Bug report sent. Thanks!", "/")),
        Err(e) => {
            tracing::warn!(error = %e, "Bug report webhook failed");
            Ok(notice::redirect(jar, "Could not send bug report.", "/"))
        }
    }
}
