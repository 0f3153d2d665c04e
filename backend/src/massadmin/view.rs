//! The mass change screen: permission and existence checks, optional
//! submission, and the context handed to the template renderer.

use crate::error::MassEditError;
use crate::massadmin::dispatcher::{self, Submission, TaskQueue};
use crate::massadmin::form::{self, AdminForm, FormErrors};
use crate::massadmin::records::{self, Record};
use crate::massadmin::registry::ModelAdmin;
use crate::massadmin::request::RequestContext;
use crate::massadmin::sanitize;
use common::model::batch::IdentifierBatch;
use log::{info, warn};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;

/// Scripts the mass change form needs on top of the admin's own.
const MEDIA: &[&str] = &["massadmin/js/massadmin.js"];

/// Everything the template renderer receives.
#[derive(Debug, Serialize)]
pub struct MassChangeContext {
    pub title: String,
    pub adminform: AdminForm,
    pub object_id: String,
    pub original: Record,
    pub unique_fields: Vec<String>,
    pub exclude_fields: Vec<String>,
    pub is_popup: bool,
    pub media: Vec<String>,
    pub errors: Option<FormErrors>,
    pub general_error: Option<String>,
    pub app_label: String,
    pub object_ids: String,
    pub mass_changes_fields: Vec<String>,
}

/// Renders the mass change form for `batch` and, on POST, submits the edit.
///
/// A POST validates the selected fields, saves them on the first record of the
/// batch (the template) and enqueues one job that copies them to the rest. The
/// form is rendered again either way; the job's outcome is never waited for.
pub fn async_mass_change_view(
    conn: &Connection,
    admin: &dyn ModelAdmin,
    queue: &dyn TaskQueue,
    request: &RequestContext,
    batch: &IdentifierBatch,
) -> Result<MassChangeContext, MassEditError> {
    let model = admin.model();
    let exclude_fields = admin.massadmin_exclude().to_vec();
    let queryset = admin.massadmin_queryset(request);

    let object_id = batch.first().ok_or(MassEditError::EmptySelection)?;
    let obj = match records::fetch(conn, &queryset, object_id) {
        Ok(obj) => obj,
        Err(MassEditError::InvalidIdentifier(_)) => None,
        Err(e) => return Err(e),
    };

    if !admin.has_change_permission(request.user.as_ref(), obj.as_ref()) {
        warn!(
            "{} may not change {}",
            request
                .user
                .as_ref()
                .map(|u| u.username.as_str())
                .unwrap_or("anonymous"),
            model.label()
        );
        return Err(MassEditError::PermissionDenied);
    }
    let mut obj = obj.ok_or_else(|| model.not_found(object_id))?;

    let mut mass_changes_fields: Vec<String> = Vec::new();
    for name in request.post.get_list("_mass_change") {
        if !exclude_fields.iter().any(|excluded| excluded == name)
            && !mass_changes_fields.iter().any(|seen| seen == name)
        {
            mass_changes_fields.push(name.to_string());
        }
    }

    let mut errors = None;
    let mut general_error = None;

    if request.is_post() {
        match form::bind(model, &request.post, &mass_changes_fields) {
            Ok(values) => match records::save_fields(conn, model, object_id, &values) {
                Ok(_) => {
                    obj.extend(values);
                    let cleaned = sanitize::remove_nonserializable(&request.attributes());
                    dispatcher::enqueue_mass_edit(
                        queue,
                        Submission {
                            batch,
                            model,
                            mass_changes_fields: &mass_changes_fields,
                            template_object_id: object_id,
                            request: Value::Object(cleaned),
                            snapshot: records::snapshot(model, &obj),
                        },
                    );
                }
                Err(MassEditError::Integrity(message)) => {
                    info!("Template {} of {} rejected: {}", object_id, model.label(), message);
                    general_error = Some(message);
                }
                Err(e) => return Err(e),
            },
            Err(field_errors) => errors = Some(field_errors),
        }
    }

    Ok(MassChangeContext {
        title: format!("Change {}", model.verbose_name),
        adminform: AdminForm::new(model, &exclude_fields, &obj),
        object_id: object_id.to_string(),
        original: obj,
        unique_fields: model.unique_fields(),
        exclude_fields,
        is_popup: request.is_popup(),
        media: MEDIA.iter().map(|m| m.to_string()).collect(),
        errors,
        general_error,
        app_label: model.app_label.clone(),
        object_ids: batch.joined(),
        mass_changes_fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::massadmin::request::MultiMap;
    use crate::test_support::{self, RecordingQueue};
    use actix_web::http::Method;
    use serde_json::json;

    fn post(form: &[u8]) -> RequestContext {
        let mut request = test_support::request_as(Some(test_support::editor()));
        request.method = Method::POST;
        request.post = MultiMap::parse(form);
        request
    }

    #[test]
    fn get_renders_the_first_record_without_dispatching() {
        let (_dir, conn) = test_support::database();
        let registry = test_support::registry();
        let admin = registry.get("todo", "task").unwrap();
        let queue = RecordingQueue::default();
        let request = test_support::request_as(Some(test_support::editor()));

        let ctx = async_mass_change_view(
            &conn,
            admin.as_ref(),
            &queue,
            &request,
            &IdentifierBatch::new([2, 3]),
        )
        .unwrap();

        assert_eq!(ctx.title, "Change task");
        assert_eq!(ctx.object_id, "2");
        assert_eq!(ctx.object_ids, "2,3");
        assert_eq!(ctx.original["status"], json!("new"));
        assert_eq!(ctx.exclude_fields, ["title"]);
        assert_eq!(ctx.unique_fields, ["id", "code"]);
        assert!(ctx.errors.is_none());
        assert!(queue.jobs().is_empty());
    }

    #[test]
    fn post_saves_the_template_and_enqueues_one_job() {
        let (_dir, conn) = test_support::database();
        let registry = test_support::registry();
        let admin = registry.get("todo", "task").unwrap();
        let queue = RecordingQueue::default();
        let request =
            post(b"_mass_change=status&_mass_change=title&status=active&title=ignored&priority=9");

        let ctx = async_mass_change_view(
            &conn,
            admin.as_ref(),
            &queue,
            &request,
            &IdentifierBatch::new([2, 3, 4]),
        )
        .unwrap();

        // `title` is excluded and `priority` was not selected.
        assert_eq!(ctx.mass_changes_fields, ["status"]);
        assert_eq!(test_support::column(&conn, 2, "status"), json!("active"));
        assert_eq!(test_support::column(&conn, 2, "priority"), json!(1));
        assert_eq!(test_support::column(&conn, 3, "status"), json!("new"));

        let jobs = queue.jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].template_object_id, "2");
        assert_eq!(jobs[0].object_ids, "2,3,4");
        assert_eq!(jobs[0].mass_changes_fields, ["status"]);
        assert_eq!(jobs[0].requested_by(), Some("editor"));
        assert_eq!(jobs[0].request["session"], Value::Null);
        assert_eq!(jobs[0].snapshot[0]["fields"]["status"], json!("active"));
    }

    #[test]
    fn invalid_submission_renders_errors_and_dispatches_nothing() {
        let (_dir, conn) = test_support::database();
        let registry = test_support::registry();
        let admin = registry.get("todo", "task").unwrap();
        let queue = RecordingQueue::default();
        let request = post(b"_mass_change=priority&priority=lots");

        let ctx = async_mass_change_view(
            &conn,
            admin.as_ref(),
            &queue,
            &request,
            &IdentifierBatch::new([2, 3]),
        )
        .unwrap();

        assert_eq!(ctx.errors.unwrap()["priority"], ["Enter a whole number."]);
        assert!(queue.jobs().is_empty());
        assert_eq!(test_support::column(&conn, 2, "priority"), json!(1));
    }

    #[test]
    fn unique_clash_on_the_template_becomes_a_general_error() {
        let (_dir, conn) = test_support::database();
        let registry = test_support::registry();
        let admin = registry.get("todo", "task").unwrap();
        let queue = RecordingQueue::default();
        let request = post(b"_mass_change=code&code=T-1");

        let ctx = async_mass_change_view(
            &conn,
            admin.as_ref(),
            &queue,
            &request,
            &IdentifierBatch::new([2, 3]),
        )
        .unwrap();

        assert!(ctx.general_error.is_some());
        assert!(queue.jobs().is_empty());
    }

    #[test]
    fn user_without_change_permission_is_denied() {
        let (_dir, conn) = test_support::database();
        let registry = test_support::registry();
        let admin = registry.get("todo", "task").unwrap();
        let queue = RecordingQueue::default();
        let mut viewer = test_support::staff_user("viewer");
        viewer.permissions.clear();
        let request = test_support::request_as(Some(viewer));

        let err = async_mass_change_view(
            &conn,
            admin.as_ref(),
            &queue,
            &request,
            &IdentifierBatch::new([2]),
        )
        .unwrap_err();
        assert!(matches!(err, MassEditError::PermissionDenied));
    }

    #[test]
    fn missing_first_record_is_not_found_with_a_readable_message() {
        let (_dir, conn) = test_support::database();
        let registry = test_support::registry();
        let admin = registry.get("todo", "task").unwrap();
        let queue = RecordingQueue::default();
        let request = test_support::request_as(Some(test_support::editor()));

        for batch in [IdentifierBatch::new([404, 2]), IdentifierBatch::parse("abc")] {
            let err =
                async_mass_change_view(&conn, admin.as_ref(), &queue, &request, &batch)
                    .unwrap_err();
            match err {
                MassEditError::NotFound(message) => {
                    assert!(message.starts_with("task object with primary key"))
                }
                other => panic!("unexpected error: {:?}", other),
            }
        }
    }

    #[test]
    fn queryset_override_limits_the_representative_record() {
        let (_dir, conn) = test_support::database();
        let registry = test_support::registry();
        let admin = registry.get("todo", "note").unwrap();
        let queue = RecordingQueue::default();
        let request = test_support::request_as(Some(test_support::editor()));

        // Note 2 belongs to someone else.
        assert!(async_mass_change_view(
            &conn,
            admin.as_ref(),
            &queue,
            &request,
            &IdentifierBatch::new([1])
        )
        .is_ok());
        assert!(matches!(
            async_mass_change_view(
                &conn,
                admin.as_ref(),
                &queue,
                &request,
                &IdentifierBatch::new([2])
            ),
            Err(MassEditError::NotFound(_))
        ));
    }
}
