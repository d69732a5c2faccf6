use std::{collections::HashMap, sync::Arc};

use axum::{Extension, extract::Query, response::Html};
use tokio::sync::Mutex;

use crate::{
    config,
    spotify::auth::{ClientCredentials, exchange_code},
    types::PkceToken,
    warning,
};

pub async fn callback(
    Query(params): Query<HashMap<String, String>>,
    Extension(shared_state): Extension<Arc<Mutex<Option<PkceToken>>>>,
) -> Html<&'static str> {
    if let Some(error) = params.get("error") {
        warning!("Authorization was denied: {}", error);
        return Html("<h4>Authorization denied.</h4>");
    }

    let Some(code) = params.get("code") else {
        return Html("<h4>Missing authorization code.</h4>");
    };

    let mut state = shared_state.lock().await;
    let Some(pkce_state) = state.as_mut() else {
        return Html("<h4>Missing PKCE code verifier.</h4>");
    };

    if params.get("state") != Some(&pkce_state.state) {
        warning!("State mismatch in authorization callback, ignoring it");
        return Html("<h4>State mismatch. Login rejected.</h4>");
    }

    let exchanged = match (ClientCredentials::from_env(), config::spotify_redirect_uri()) {
        (Ok(credentials), Ok(redirect_uri)) => {
            exchange_code(&credentials, code, &pkce_state.code_verifier, &redirect_uri).await
        }
        (Err(e), _) | (_, Err(e)) => Err(e),
    };

    match exchanged {
        Ok(token) => {
            pkce_state.token = Some(token);
            Html("<h2>Authentication successful.</h2><p>Close browser window.</p>")
        }
        Err(e) => {
            warning!("Token exchange failed: {}", e);
            Html("<h4>Login failed.</h4>")
        }
    }
}
