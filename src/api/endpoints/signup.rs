//! Staff signup (doctors create receptionist accounts).

use axum::extract::State;
use axum::response::Redirect;
use axum::{Extension, Form, Json};
use serde::Serialize;

use crate::accounts;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::authorization::{authorize, Caller, Operation};
use crate::validation::SignupForm;

#[derive(Serialize)]
pub struct SignupPage {
    pub form: SignupForm,
}

/// `GET /signup`
pub async fn form(Extension(caller): Extension<Caller>) -> Result<Json<SignupPage>, ApiError> {
    authorize(&caller, Operation::SignUpStaff)?;
    Ok(Json(SignupPage {
        form: SignupForm::default(),
    }))
}

/// `POST /signup`: passwords are never echoed on failure.
pub async fn submit(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Form(form): Form<SignupForm>,
) -> Result<Redirect, ApiError> {
    let core = ctx.core.clone();
    tokio::task::spawn_blocking(move || -> Result<(), ApiError> {
        let conn = core.open_db()?;
        accounts::sign_up_receptionist(&conn, &caller, &form)
            .map_err(|e| ApiError::from(e).echo(&form))?;
        Ok(())
    })
    .await??;
    Ok(Redirect::to("/dashboard"))
}
