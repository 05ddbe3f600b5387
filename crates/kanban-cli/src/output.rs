use kanban_core::{KanbanError, MoveError};
use serde::Serialize;

#[derive(Serialize)]
pub struct CliResponse<T: Serialize> {
    pub success: bool,
    pub api_version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Stable machine-readable error kind, e.g. `cross_board_move`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

#[derive(Serialize)]
pub struct ListResponse<T: Serialize> {
    pub items: Vec<T>,
    pub count: usize,
}

fn render<T: Serialize>(response: &CliResponse<T>) -> String {
    serde_json::to_string(response).unwrap_or_else(|e| {
        format!(
            r#"{{"success":false,"api_version":"{}","error":"failed to encode response: {}"}}"#,
            env!("CARGO_PKG_VERSION"),
            e
        )
    })
}

pub fn output_success<T: Serialize>(data: T) {
    let response = CliResponse {
        success: true,
        api_version: env!("CARGO_PKG_VERSION"),
        data: Some(data),
        error: None,
        code: None,
    };
    println!("{}", render(&response));
}

pub fn output_list<T: Serialize>(items: Vec<T>) {
    let count = items.len();
    let list = ListResponse { items, count };
    output_success(list);
}

/// Outputs an error response to stderr and terminates the process.
///
/// This function uses the never type (`!`) because it always exits the process
/// with code 1 after printing the error. This is intentional CLI behavior to
/// signal failure to shell scripts and CI pipelines.
pub fn output_error(message: &str) -> ! {
    exit_with(message.to_string(), None)
}

/// Like [`output_error`], tagging engine and store failures with their code.
pub fn output_failure(err: &anyhow::Error) -> ! {
    exit_with(err.to_string(), error_code(err))
}

fn error_code(err: &anyhow::Error) -> Option<&'static str> {
    if let Some(move_err) = err.downcast_ref::<MoveError>() {
        return Some(move_err.code());
    }
    err.downcast_ref::<KanbanError>().map(|_| "store")
}

fn exit_with(message: String, code: Option<&'static str>) -> ! {
    let response: CliResponse<()> = CliResponse {
        success: false,
        api_version: env!("CARGO_PKG_VERSION"),
        data: None,
        error: Some(message),
        code,
    };
    eprintln!("{}", render(&response));
    std::process::exit(1);
}
