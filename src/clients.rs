//! Client record operations: register, view, medical edit, delete.

use rusqlite::Connection;

use crate::authorization::{authorize, AccessError, Caller, Operation};
use crate::db::{self, DatabaseError};
use crate::models::{next_update_stamp, Client};
use crate::validation::{validate_client, validate_medical, ClientForm, FieldErrors, MedicalForm};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Client not found")]
    NotFound,
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("Invalid client data")]
    Validation(FieldErrors),
    #[error("Database error: {0}")]
    Database(DatabaseError),
}

impl From<DatabaseError> for ClientError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { .. } => Self::NotFound,
            other => Self::Database(other),
        }
    }
}

fn load(conn: &Connection, id: i64) -> Result<Client, ClientError> {
    db::get_client(conn, id)?.ok_or(ClientError::NotFound)
}

/// Register a client on behalf of `caller`.
pub fn create_client(
    conn: &Connection,
    caller: &Caller,
    form: &ClientForm,
) -> Result<Client, ClientError> {
    authorize(caller, Operation::CreateClient)?;
    let identity = validate_client(form).map_err(ClientError::Validation)?;

    let id = db::insert_client(conn, &identity, caller.user_id)?;
    tracing::info!(client_id = id, by = %caller.username, "Client registered");
    load(conn, id)
}

/// Any staff member may open any client.
pub fn view_client(conn: &Connection, caller: &Caller, id: i64) -> Result<Client, ClientError> {
    authorize(caller, Operation::ViewClient)?;
    load(conn, id)
}

/// Pre-filled medical form for the edit page.
pub fn medical_form(
    conn: &Connection,
    caller: &Caller,
    id: i64,
) -> Result<(Client, MedicalForm), ClientError> {
    authorize(caller, Operation::EditMedical)?;
    let client = load(conn, id)?;
    let form = MedicalForm::from_client(&client);
    Ok((client, form))
}

pub fn update_medical(
    conn: &Connection,
    caller: &Caller,
    id: i64,
    form: &MedicalForm,
) -> Result<Client, ClientError> {
    authorize(caller, Operation::EditMedical)?;
    let current = load(conn, id)?;
    let update = validate_medical(form).map_err(ClientError::Validation)?;

    db::update_medical(conn, id, &update, &next_update_stamp(&current.updated_at))?;
    tracing::info!(client_id = id, doctor = %caller.username, "Medical record updated");
    load(conn, id)
}

pub fn delete_client(conn: &Connection, caller: &Caller, id: i64) -> Result<(), ClientError> {
    authorize(caller, Operation::DeleteClient)?;
    db::delete_client(conn, id)?;
    tracing::info!(client_id = id, doctor = %caller.username, "Client deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::{NewUser, UserType};

    fn add_user(conn: &Connection, username: &str, user_type: UserType) -> Caller {
        let id = db::insert_user(
            conn,
            &NewUser {
                username: username.into(),
                email: String::new(),
                phone: None,
                user_type,
                is_superuser: false,
                password_hash: "h".into(),
                password_salt: "s".into(),
            },
        )
        .unwrap();
        Caller::from_user(&db::get_user(conn, id).unwrap().unwrap())
    }

    fn form() -> ClientForm {
        ClientForm {
            first_name: " Abeba ".into(),
            last_name: "Kebede".into(),
            age: "34".into(),
            email: String::new(),
            phone: "1234 5678".into(),
            gender: "F".into(),
        }
    }

    #[test]
    fn receptionist_registers_and_any_staff_views() {
        let conn = open_memory_database().unwrap();
        let desk = add_user(&conn, "desk", UserType::Receptionist);
        let other_desk = add_user(&conn, "desk2", UserType::Receptionist);

        let client = create_client(&conn, &desk, &form()).unwrap();
        assert_eq!(client.first_name, "Abeba");
        assert_eq!(client.phone, "+251912345678");
        assert_eq!(client.created_by, desk.user_id);
        assert_eq!(client.created_by_username, "desk");
        assert!(!client.referral.is_referred);

        let seen = view_client(&conn, &other_desk, client.id).unwrap();
        assert_eq!(seen.id, client.id);
    }

    #[test]
    fn invalid_form_is_rejected_without_insert() {
        let conn = open_memory_database().unwrap();
        let desk = add_user(&conn, "desk", UserType::Receptionist);
        let mut bad = form();
        bad.age = "0".into();
        match create_client(&conn, &desk, &bad) {
            Err(ClientError::Validation(errors)) => assert!(errors.has("age")),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(db::list_clients(&conn, None).unwrap().is_empty());
    }

    #[test]
    fn medical_edit_requires_doctor_and_bumps_updated_at() {
        let conn = open_memory_database().unwrap();
        let desk = add_user(&conn, "desk", UserType::Receptionist);
        let doctor = add_user(&conn, "drsmith", UserType::Doctor);
        let client = create_client(&conn, &desk, &form()).unwrap();

        assert!(matches!(
            medical_form(&conn, &desk, client.id),
            Err(ClientError::Access(_))
        ));

        let (_, mut edit) = medical_form(&conn, &doctor, client.id).unwrap();
        assert_eq!(edit.phone, "12345678");
        edit.diagnosis = "Typhoid".into();
        edit.treatment_plan = "Ciprofloxacin".into();

        let updated = update_medical(&conn, &doctor, client.id, &edit).unwrap();
        assert_eq!(updated.diagnosis, "Typhoid");
        assert_eq!(updated.phone, "+251912345678");
        assert!(updated.updated_at > client.updated_at);
        assert_eq!(updated.created_at, client.created_at);
    }

    #[test]
    fn medical_edit_rejects_out_of_range_age() {
        let conn = open_memory_database().unwrap();
        let doctor = add_user(&conn, "drsmith", UserType::Doctor);
        let client = create_client(&conn, &doctor, &form()).unwrap();
        let (_, mut edit) = medical_form(&conn, &doctor, client.id).unwrap();
        edit.age = "121".into();
        assert!(matches!(
            update_medical(&conn, &doctor, client.id, &edit),
            Err(ClientError::Validation(_))
        ));
        assert_eq!(view_client(&conn, &doctor, client.id).unwrap().age, 34);
    }

    #[test]
    fn delete_is_doctor_only_and_reports_missing() {
        let conn = open_memory_database().unwrap();
        let desk = add_user(&conn, "desk", UserType::Receptionist);
        let doctor = add_user(&conn, "drsmith", UserType::Doctor);
        let client = create_client(&conn, &desk, &form()).unwrap();

        assert!(matches!(
            delete_client(&conn, &desk, client.id),
            Err(ClientError::Access(_))
        ));
        delete_client(&conn, &doctor, client.id).unwrap();
        assert!(matches!(
            view_client(&conn, &desk, client.id),
            Err(ClientError::NotFound)
        ));
        assert!(matches!(
            delete_client(&conn, &doctor, client.id),
            Err(ClientError::NotFound)
        ));
    }
}
