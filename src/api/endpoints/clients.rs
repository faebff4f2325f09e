//! Client record pages: register, view, medical edit, delete.

use axum::extract::{Path, State};
use axum::response::Redirect;
use axum::{Extension, Form, Json};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::authorization::{authorize, Caller, Operation};
use crate::clients;
use crate::models::{Client, Gender};
use crate::validation::{ClientForm, MedicalForm};

#[derive(Serialize)]
pub struct ClientFormPage {
    pub form: ClientForm,
    pub genders: Vec<GenderChoice>,
}

#[derive(Serialize)]
pub struct GenderChoice {
    pub value: &'static str,
    pub label: &'static str,
}

#[derive(Serialize)]
pub struct MedicalFormPage {
    pub client: Client,
    pub form: MedicalForm,
}

fn gender_choices() -> Vec<GenderChoice> {
    [Gender::Male, Gender::Female]
        .into_iter()
        .map(|g| GenderChoice {
            value: g.as_str(),
            label: g.label(),
        })
        .collect()
}

/// `GET /clients/new`
pub async fn new_form(
    Extension(caller): Extension<Caller>,
) -> Result<Json<ClientFormPage>, ApiError> {
    authorize(&caller, Operation::CreateClient)?;
    Ok(Json(ClientFormPage {
        form: ClientForm::default(),
        genders: gender_choices(),
    }))
}

/// `POST /clients`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Form(form): Form<ClientForm>,
) -> Result<Redirect, ApiError> {
    let conn = ctx.core.open_db()?;
    clients::create_client(&conn, &caller, &form).map_err(|e| ApiError::from(e).echo(&form))?;
    Ok(Redirect::to("/dashboard"))
}

/// `GET /clients/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i64>,
) -> Result<Json<Client>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(clients::view_client(&conn, &caller, id)?))
}

/// `GET /clients/:id/medical`
pub async fn medical_form(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i64>,
) -> Result<Json<MedicalFormPage>, ApiError> {
    let conn = ctx.core.open_db()?;
    let (client, form) = clients::medical_form(&conn, &caller, id)?;
    Ok(Json(MedicalFormPage { client, form }))
}

/// `POST /clients/:id/medical`
pub async fn update_medical(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i64>,
    Form(form): Form<MedicalForm>,
) -> Result<Redirect, ApiError> {
    let conn = ctx.core.open_db()?;
    clients::update_medical(&conn, &caller, id, &form)
        .map_err(|e| ApiError::from(e).echo(&form))?;
    Ok(Redirect::to("/dashboard"))
}

/// `GET /clients/:id/delete`: deletion needs a POST; show the edit page.
pub async fn delete_prompt(
    Extension(caller): Extension<Caller>,
    Path(id): Path<i64>,
) -> Result<Redirect, ApiError> {
    authorize(&caller, Operation::DeleteClient)?;
    Ok(Redirect::to(&format!("/clients/{id}/medical")))
}

/// `POST /clients/:id/delete`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i64>,
) -> Result<Redirect, ApiError> {
    let conn = ctx.core.open_db()?;
    clients::delete_client(&conn, &caller, id)?;
    Ok(Redirect::to("/dashboard"))
}
