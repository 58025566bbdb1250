//! `pushmanager push ...`

use super::display;
use crate::cli::{PushCommand, RuntimeConfig};
use crate::error::{PushError, Result};
use crate::push::PushEdit;
use crate::session::create_push;
use crate::store::PushStore;

pub(super) async fn execute(command: &PushCommand, config: &RuntimeConfig) -> Result<i32> {
    match command {
        PushCommand::New { title, branch } => {
            let store = config.store();
            let push = create_push(&*store, title, branch, &config.settings().user).await?;
            config.success_println(&format!("Created {}", display::push_line(&push)));
            Ok(0)
        }

        PushCommand::List => {
            let pushes = config
                .store()
                .list_pushes()
                .await
                .map_err(PushError::remote("list pushes"))?;
            if pushes.is_empty() {
                config.println("No pushes yet");
            }
            for push in &pushes {
                config.println(&display::push_line(push));
            }
            Ok(0)
        }

        PushCommand::Show { push, json } => {
            if *json {
                let snapshot = config
                    .store()
                    .fetch_push(*push)
                    .await
                    .map_err(PushError::remote(format!("show push {}", push)))?;
                let _ = config.output().data(&serde_json::to_string_pretty(&snapshot)?);
                return Ok(0);
            }
            let session = config.open_session(*push).await?;
            display::show_session(config, &session);
            Ok(0)
        }

        PushCommand::Edit {
            push,
            title,
            branch,
            stage_env,
        } => {
            let edit = PushEdit {
                title: title.clone(),
                branch: branch.clone(),
                stage_env: stage_env.clone(),
            };
            if edit == PushEdit::default() {
                config.println("Nothing to change");
                return Ok(0);
            }
            let mut session = config.open_session(*push).await?;
            session.edit_push(edit).await?;
            config.success_println(&format!("Updated {}", display::push_line(session.push())));
            Ok(0)
        }

        PushCommand::StageEnv { push, env } => {
            let mut session = config.open_session(*push).await?;
            session.set_stage_env(env).await?;
            config.success_println(&format!(
                "Push {} stages on {}",
                push,
                session.push().stage_env().unwrap_or_default()
            ));
            Ok(0)
        }

        PushCommand::Add { push, requests } => {
            let mut session = config.open_session(*push).await?;
            let outcome = session.add_requests(requests).await?;
            Ok(display::report(config, "merge", outcome))
        }

        PushCommand::Remove { push, requests } => {
            let mut session = config.open_session(*push).await?;
            let outcome = session.remove_requests(requests).await?;
            Ok(display::report(config, "removal", outcome))
        }

        PushCommand::Rebuild { push } => {
            let mut session = config.open_session(*push).await?;
            let outcome = session.rebuild().await?;
            Ok(display::report(
                config,
                "rebuild",
                outcome.map(|()| Default::default()),
            ))
        }

        PushCommand::Stage { push } => {
            let mut session = config.open_session(*push).await?;
            let outcome = session.deploy_to_stage().await?;
            Ok(display::report(config, "deploy to stage", outcome))
        }

        PushCommand::Prod { push } => {
            let mut session = config.open_session(*push).await?;
            let outcome = session.deploy_to_prod().await?;
            Ok(display::report(config, "deploy to prod", outcome))
        }

        PushCommand::Certify { push } => {
            let mut session = config.open_session(*push).await?;
            let outcome = session.certify().await?;
            Ok(display::report(config, "certify", outcome))
        }

        PushCommand::Discard { push } => {
            let mut session = config.open_session(*push).await?;
            let outcome = session.discard().await?;
            Ok(display::report(config, "discard", outcome))
        }

        PushCommand::Watch { push, once } => {
            let session = config.open_session(*push).await?;
            if *once {
                display::checklist(config, &session.checklist().await?);
                return Ok(0);
            }

            let poller = session.start_checklist_poller();
            let mut updates = poller.subscribe();
            config.println("Watching checklist; Ctrl-C to stop");
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    changed = updates.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let status = updates.borrow_and_update().clone();
                        display::checklist_status(config, &status);
                    }
                }
            }
            poller.stop().await;
            Ok(0)
        }

        PushCommand::Check { push, item, undo } => {
            let session = config.open_session(*push).await?;
            let item = session.toggle_checklist_item(*item, !*undo).await?;
            let state = if item.complete { "complete" } else { "open" };
            config.success_println(&format!(
                "Checklist item {} ({} {}) is {}",
                item.id, item.kind, item.target, state
            ));
            Ok(0)
        }

        PushCommand::Message {
            push,
            section,
            text,
        } => {
            let session = config.open_session(*push).await?;
            let sent_to = match section {
                Some(section) => session.message_section(*section, text).await?,
                None => session.message_all(text).await?,
            };
            if sent_to.is_empty() {
                config.warning_println("Nobody to message");
            } else {
                config.success_println(&format!("Messaged {}", sent_to.join(", ")));
            }
            Ok(0)
        }
    }
}
