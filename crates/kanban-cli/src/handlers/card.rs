use crate::cli::{CardAction, CardCreateArgs};
use crate::context::CliContext;
use crate::output;
use kanban_domain::CardDraft;

pub async fn handle(ctx: &CliContext, action: CardAction) -> anyhow::Result<()> {
    let engine = &ctx.engine;
    match action {
        CardAction::Create(args) => {
            let list_id = args.list_id;
            let draft = match build_draft(args) {
                Ok(draft) => draft,
                Err(e) => output::output_error(&e),
            };
            let card = engine.create_card(list_id, draft).await?;
            output::output_success(&card);
        }
        CardAction::Get { id } => {
            let card = engine.card(id).await?;
            output::output_success(&card);
        }
        CardAction::Move {
            id,
            list_id,
            insertion,
        } => {
            let point = insertion.point();
            let outcome = match list_id {
                Some(list_id) => engine.move_card(id, list_id, point).await?,
                None => engine.reorder_card(id, point).await?,
            };
            output::output_success(&outcome);
        }
        CardAction::Archive { id } => {
            let card = engine.archive_card(id).await?;
            output::output_success(&card);
        }
        CardAction::Restore { id, list_id } => {
            let card = engine.restore_card(id, list_id).await?;
            output::output_success(&card);
        }
    }
    Ok(())
}

fn build_draft(args: CardCreateArgs) -> Result<CardDraft, String> {
    let mut draft = CardDraft::titled(args.title);
    if let Some(description) = args.description {
        draft = draft.with_description(description);
    }
    if let Some(due_date) = &args.due_date {
        draft = draft.with_due_date(parse_datetime(due_date)?);
    }
    Ok(draft)
}

fn parse_datetime(s: &str) -> Result<chrono::DateTime<chrono::Utc>, String> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .or_else(|_| {
            chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|_| ())
                .and_then(|d| d.and_hms_opt(0, 0, 0).ok_or(()))
                .map(|dt| dt.and_utc())
        })
        .map_err(|_| {
            format!(
                "Invalid date '{}'. Supported formats: YYYY-MM-DD or RFC 3339 (e.g., 2024-01-15T10:30:00Z)",
                s
            )
        })
}
