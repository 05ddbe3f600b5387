use crate::cli::BoardAction;
use crate::context::CliContext;
use crate::output;

pub async fn handle(ctx: &CliContext, action: BoardAction) -> anyhow::Result<()> {
    let engine = &ctx.engine;
    match action {
        BoardAction::Create { name, tenant_id } => {
            let board = engine.create_board(name, tenant_id).await?;
            output::output_success(&board);
        }
        BoardAction::List { archived } => {
            let boards = engine.boards(archived).await?;
            output::output_list(boards);
        }
        BoardAction::Get { id } => {
            let board = engine.board(id).await?;
            output::output_success(&board);
        }
        BoardAction::Archive { id } => {
            let board = engine.archive_board(id).await?;
            output::output_success(&board);
        }
        BoardAction::Restore { id } => {
            let board = engine.restore_board(id).await?;
            output::output_success(&board);
        }
        BoardAction::Normalize { id } => {
            let report = engine.normalize_board(id).await?;
            output::output_success(&report);
        }
        BoardAction::Lists { id, archived } => {
            let lists = engine.board_lists(id, archived).await?;
            output::output_list(lists);
        }
    }
    Ok(())
}
