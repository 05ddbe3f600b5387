use crate::cli::ListAction;
use crate::context::CliContext;
use crate::output;

pub async fn handle(ctx: &CliContext, action: ListAction) -> anyhow::Result<()> {
    let engine = &ctx.engine;
    match action {
        ListAction::Create { board_id, name } => {
            let list = engine.create_list(board_id, name).await?;
            output::output_success(&list);
        }
        ListAction::Get { id } => {
            let list = engine.list(id).await?;
            output::output_success(&list);
        }
        ListAction::Move { id, insertion } => {
            let outcome = engine.move_list(id, insertion.point()).await?;
            output::output_success(&outcome);
        }
        ListAction::Archive { id } => {
            let list = engine.archive_list(id).await?;
            output::output_success(&list);
        }
        ListAction::Restore { id } => {
            let list = engine.restore_list(id).await?;
            output::output_success(&list);
        }
        ListAction::Normalize { id } => {
            let report = engine.normalize_list(id).await?;
            output::output_success(&report);
        }
        ListAction::Cards { id, archived } => {
            let cards = engine.list_cards(id, archived).await?;
            output::output_list(cards);
        }
    }
    Ok(())
}
