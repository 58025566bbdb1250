//! `pushmanager request ...`

use super::display;
use crate::cli::{RequestCommand, RequestFieldArgs, RuntimeConfig};
use crate::error::{PushError, Result};
use crate::request::{Request, RequestForm};
use crate::session::{TransitionReport, comment_request, submit_request};
use crate::store::PushStore;

/// Form for a new submission
fn new_form(fields: &RequestFieldArgs, main_repository: &str) -> RequestForm {
    let mut form = RequestForm {
        repo: main_repository.to_string(),
        ..Default::default()
    };
    apply_fields(&mut form, fields);
    form
}

/// Form pre-filled from a stored request
fn edit_form(request: &Request, fields: &RequestFieldArgs, takeover: bool) -> RequestForm {
    let mut form = RequestForm {
        id: Some(request.id),
        title: request.title.clone(),
        branch: request.branch.clone(),
        repo: request.repo.clone(),
        review: request.review_id.map(|id| id.to_string()).unwrap_or_default(),
        tags: request.tags.to_string(),
        comments: request.comments.clone(),
        description: request.description.clone(),
        watchers: request.watchers.join(","),
        takeover,
    };
    apply_fields(&mut form, fields);
    form
}

fn apply_fields(form: &mut RequestForm, fields: &RequestFieldArgs) {
    let slots = [
        (&mut form.title, &fields.title),
        (&mut form.branch, &fields.branch),
        (&mut form.repo, &fields.repo),
        (&mut form.review, &fields.review),
        (&mut form.tags, &fields.tags),
        (&mut form.description, &fields.description),
        (&mut form.watchers, &fields.watchers),
    ];
    for (slot, value) in slots {
        if let Some(value) = value {
            *slot = value.clone();
        }
    }
}

fn transitioned(config: &RuntimeConfig, id: u64, verb: &str, report: TransitionReport) -> i32 {
    config.success_println(&format!("Request {} {}", id, verb));
    display::warnings(config, &report.warnings);
    0
}

pub(super) async fn execute(command: &RequestCommand, config: &RuntimeConfig) -> Result<i32> {
    let settings = config.settings();
    match command {
        RequestCommand::New { fields } => {
            let form = new_form(fields, &settings.main_repository);
            let request = submit_request(&*config.store(), &form, &settings.user).await?;
            config.success_println(&format!(
                "Submitted {}",
                display::request_line(&request, &settings.main_repository)
            ));
            Ok(0)
        }

        RequestCommand::Edit {
            id,
            fields,
            takeover,
        } => {
            let store = config.store();
            let current = store
                .fetch_request(*id)
                .await
                .map_err(PushError::remote(format!("fetch request {}", id)))?;
            let form = edit_form(&current, fields, *takeover);
            let request = submit_request(&*store, &form, &settings.user).await?;
            config.success_println(&format!(
                "Updated {}",
                display::request_line(&request, &settings.main_repository)
            ));
            Ok(0)
        }

        RequestCommand::Pickme { push, id } => {
            let report = config.open_session(*push).await?.pickme(*id).await?;
            Ok(transitioned(config, *id, "picked", report))
        }

        RequestCommand::Unpickme { push, id } => {
            let report = config.open_session(*push).await?.unpickme(*id).await?;
            Ok(transitioned(config, *id, "unpicked", report))
        }

        RequestCommand::Verify { push, id } => {
            let report = config.open_session(*push).await?.verify(*id).await?;
            Ok(transitioned(config, *id, "verified", report))
        }

        RequestCommand::Delay { push, id } => {
            let report = config.open_session(*push).await?.delay(*id).await?;
            Ok(transitioned(config, *id, "delayed", report))
        }

        RequestCommand::Undelay { push, id } => {
            let report = config.open_session(*push).await?.undelay(*id).await?;
            Ok(transitioned(config, *id, "requested again", report))
        }

        RequestCommand::Discard { push, id } => {
            let mut session = config.open_session(*push).await?;
            let outcome = session.discard_request(*id).await?;
            Ok(display::report(config, "discard request", outcome))
        }

        RequestCommand::Comment { id, text } => {
            comment_request(&*config.store(), *id, &settings.user, text).await?;
            config.success_println(&format!("Commented on request {}", id));
            Ok(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestFields;

    #[test]
    fn test_edit_form_keeps_unchanged_fields() {
        let request = RequestFields {
            id: None,
            title: "Old".to_string(),
            branch: "old_branch".to_string(),
            repo: "bob".to_string(),
            review_id: Some(42),
            tags: crate::request::TagSet::parse("l10n hoods"),
            comments: String::new(),
            description: "d".to_string(),
            watchers: vec!["carol".to_string()],
            takeover: false,
        }
        .into_request(5, "bob");
        let fields = RequestFieldArgs {
            title: Some("New".to_string()),
            ..Default::default()
        };

        let form = edit_form(&request, &fields, false);
        assert_eq!(form.id, Some(5));
        assert_eq!(form.title, "New");
        assert_eq!(form.review, "42");
        assert_eq!(form.watchers, "carol");
        let validated = form.validate().unwrap();
        assert!(validated.tags.needs_localization());
        assert_eq!(validated.repo, "bob");
    }

    #[test]
    fn test_new_form_defaults_repo() {
        let form = new_form(&RequestFieldArgs::default(), "main");
        assert_eq!(form.repo, "main");
        assert!(form.id.is_none());
    }
}
