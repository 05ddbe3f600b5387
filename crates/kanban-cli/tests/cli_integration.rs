use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::{tempdir, TempDir};

fn kanban(config_home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("kanban").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home)
        .env_remove("KANBAN_FILE")
        .env_remove("KANBAN_DEBUG_LOG")
        .env_remove("RUST_LOG");
    cmd
}

fn parse_json_output(output: &[u8]) -> Value {
    let text = String::from_utf8_lossy(output);
    serde_json::from_str(text.trim()).expect("Failed to parse JSON output")
}

fn extract_id(json: &Value) -> String {
    json["data"]["id"].as_str().unwrap().to_string()
}

/// A scratch data file plus an isolated config directory.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempdir().unwrap(),
        }
    }

    fn file(&self) -> String {
        self.dir.path().join("board.json").to_str().unwrap().to_string()
    }

    fn ok(&self, args: &[&str]) -> Value {
        let file = self.file();
        let mut full = vec!["--file", file.as_str()];
        full.extend_from_slice(args);
        let output = kanban(self.dir.path())
            .args(&full)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let json = parse_json_output(&output);
        assert!(json["success"].as_bool().unwrap());
        json
    }

    fn fail(&self, args: &[&str]) -> Value {
        let file = self.file();
        let mut full = vec!["--file", file.as_str()];
        full.extend_from_slice(args);
        let output = kanban(self.dir.path())
            .args(&full)
            .assert()
            .failure()
            .code(1)
            .get_output()
            .stderr
            .clone();
        let json = parse_json_output(&output);
        assert!(!json["success"].as_bool().unwrap());
        json
    }

    fn board(&self, name: &str) -> String {
        extract_id(&self.ok(&["board", "create", "--name", name]))
    }

    fn list(&self, board_id: &str, name: &str) -> String {
        extract_id(&self.ok(&["list", "create", "--board-id", board_id, "--name", name]))
    }

    fn card(&self, list_id: &str, title: &str) -> String {
        extract_id(&self.ok(&["card", "create", "--list-id", list_id, "--title", title]))
    }

    fn card_titles(&self, list_id: &str) -> Vec<String> {
        let json = self.ok(&["list", "cards", "--id", list_id]);
        json["data"]["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["title"].as_str().unwrap().to_string())
            .collect()
    }

    fn list_names(&self, board_id: &str) -> Vec<String> {
        let json = self.ok(&["board", "lists", "--id", board_id]);
        json["data"]["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["name"].as_str().unwrap().to_string())
            .collect()
    }
}

mod board_tests {
    use super::*;

    #[test]
    fn test_board_create() {
        let ws = Workspace::new();
        let json = ws.ok(&["board", "create", "--name", "Test Board"]);
        assert_eq!(json["data"]["name"], "Test Board");
        assert_eq!(json["data"]["archived"], false);
    }

    #[test]
    fn test_board_list_empty() {
        let ws = Workspace::new();
        let json = ws.ok(&["board", "list"]);
        assert_eq!(json["data"]["count"], 0);
    }

    #[test]
    fn test_board_get_round_trips_through_file() {
        let ws = Workspace::new();
        let id = ws.board("Roadmap");

        let json = ws.ok(&["board", "get", "--id", &id]);
        assert_eq!(json["data"]["name"], "Roadmap");
    }

    #[test]
    fn test_board_get_missing() {
        let ws = Workspace::new();
        let json = ws.fail(&["board", "get", "--id", &uuid::Uuid::new_v4().to_string()]);
        assert_eq!(json["code"], "not_found");
    }

    #[test]
    fn test_board_archive_hides_from_default_list() {
        let ws = Workspace::new();
        let id = ws.board("Old");
        ws.board("Current");

        ws.ok(&["board", "archive", "--id", &id]);
        assert_eq!(ws.ok(&["board", "list"])["data"]["count"], 1);
        assert_eq!(ws.ok(&["board", "list", "--archived"])["data"]["count"], 2);

        let json = ws.fail(&["list", "create", "--board-id", &id, "--name", "Todo"]);
        assert_eq!(json["code"], "archived");

        ws.ok(&["board", "restore", "--id", &id]);
        ws.list(&id, "Todo");
    }

    #[test]
    fn test_board_empty_name_rejected() {
        let ws = Workspace::new();
        let json = ws.fail(&["board", "create", "--name", "  "]);
        assert_eq!(json["code"], "store");
    }
}

mod list_tests {
    use super::*;

    #[test]
    fn test_lists_append_in_creation_order() {
        let ws = Workspace::new();
        let board = ws.board("B");
        ws.list(&board, "Todo");
        ws.list(&board, "Doing");
        ws.list(&board, "Done");

        assert_eq!(ws.list_names(&board), ["Todo", "Doing", "Done"]);
    }

    #[test]
    fn test_list_move_before() {
        let ws = Workspace::new();
        let board = ws.board("B");
        let todo = ws.list(&board, "Todo");
        ws.list(&board, "Doing");
        let done = ws.list(&board, "Done");

        let json = ws.ok(&["list", "move", "--id", &done, "--before", &todo]);
        assert_eq!(json["data"]["moved"], true);
        assert_eq!(ws.list_names(&board), ["Done", "Todo", "Doing"]);
    }

    #[test]
    fn test_list_move_to_index() {
        let ws = Workspace::new();
        let board = ws.board("B");
        let todo = ws.list(&board, "Todo");
        ws.list(&board, "Doing");
        ws.list(&board, "Done");

        ws.ok(&["list", "move", "--id", &todo, "--index", "1"]);
        assert_eq!(ws.list_names(&board), ["Doing", "Todo", "Done"]);
    }

    #[test]
    fn test_list_move_index_past_end_is_stale() {
        let ws = Workspace::new();
        let board = ws.board("B");
        let todo = ws.list(&board, "Todo");
        ws.list(&board, "Done");

        let json = ws.fail(&["list", "move", "--id", &todo, "--index", "5"]);
        assert_eq!(json["code"], "stale_insertion_point");
    }

    #[test]
    fn test_list_move_conflicting_flags() {
        let ws = Workspace::new();
        let id = uuid::Uuid::new_v4().to_string();
        kanban(ws.dir.path())
            .args([
                "--file",
                &ws.file(),
                "list",
                "move",
                "--id",
                &id,
                "--before",
                &id,
                "--after",
                &id,
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("cannot be used with"));
    }

    #[test]
    fn test_list_archive_and_restore() {
        let ws = Workspace::new();
        let board = ws.board("B");
        let todo = ws.list(&board, "Todo");
        ws.list(&board, "Done");

        ws.ok(&["list", "archive", "--id", &todo]);
        assert_eq!(ws.list_names(&board), ["Done"]);

        let json = ws.ok(&["board", "lists", "--id", &board, "--archived"]);
        assert_eq!(json["data"]["count"], 2);

        ws.ok(&["list", "restore", "--id", &todo]);
        assert_eq!(ws.list_names(&board), ["Todo", "Done"]);
    }

    #[test]
    fn test_board_normalize_reports() {
        let ws = Workspace::new();
        let board = ws.board("B");
        ws.list(&board, "Todo");
        ws.list(&board, "Done");

        let json = ws.ok(&["board", "normalize", "--id", &board]);
        assert_eq!(json["data"]["kind"], "board");
        assert_eq!(json["data"]["members"], 2);
        assert_eq!(json["data"]["rewritten"], 0);
    }
}

mod card_tests {
    use super::*;

    #[test]
    fn test_card_create_with_details() {
        let ws = Workspace::new();
        let board = ws.board("B");
        let list = ws.list(&board, "Todo");

        let json = ws.ok(&[
            "card",
            "create",
            "--list-id",
            &list,
            "--title",
            "Ship it",
            "--description",
            "before friday",
            "--due-date",
            "2024-01-15",
        ]);
        assert_eq!(json["data"]["title"], "Ship it");
        assert_eq!(json["data"]["description"], "before friday");
        assert!(json["data"]["due_date"]
            .as_str()
            .unwrap()
            .starts_with("2024-01-15T00:00:00"));
    }

    #[test]
    fn test_card_create_invalid_due_date() {
        let ws = Workspace::new();
        let board = ws.board("B");
        let list = ws.list(&board, "Todo");

        let json = ws.fail(&[
            "card",
            "create",
            "--list-id",
            &list,
            "--title",
            "x",
            "--due-date",
            "soon",
        ]);
        assert!(json["error"].as_str().unwrap().contains("Invalid date"));
    }

    #[test]
    fn test_card_reorder_within_list() {
        let ws = Workspace::new();
        let board = ws.board("B");
        let list = ws.list(&board, "Todo");
        let first = ws.card(&list, "first");
        ws.card(&list, "second");
        let third = ws.card(&list, "third");

        ws.ok(&["card", "move", "--id", &third, "--before", &first]);
        assert_eq!(ws.card_titles(&list), ["third", "first", "second"]);

        ws.ok(&["card", "move", "--id", &third, "--after", &first]);
        assert_eq!(ws.card_titles(&list), ["first", "third", "second"]);
    }

    #[test]
    fn test_card_move_to_another_list() {
        let ws = Workspace::new();
        let board = ws.board("B");
        let todo = ws.list(&board, "Todo");
        let done = ws.list(&board, "Done");
        let card = ws.card(&todo, "task");
        ws.card(&done, "finished");

        let json = ws.ok(&[
            "card", "move", "--id", &card, "--list-id", &done, "--index", "0",
        ]);
        assert_eq!(json["data"]["entity"]["list_id"], done.as_str());
        assert!(ws.card_titles(&todo).is_empty());
        assert_eq!(ws.card_titles(&done), ["task", "finished"]);
    }

    #[test]
    fn test_card_move_to_same_place_is_noop() {
        let ws = Workspace::new();
        let board = ws.board("B");
        let list = ws.list(&board, "Todo");
        let card = ws.card(&list, "only");

        let json = ws.ok(&["card", "move", "--id", &card]);
        assert_eq!(json["data"]["moved"], false);
    }

    #[test]
    fn test_card_cross_board_move_rejected() {
        let ws = Workspace::new();
        let home = ws.board("Home");
        let away = ws.board("Away");
        let home_list = ws.list(&home, "Todo");
        let away_list = ws.list(&away, "Todo");
        let card = ws.card(&home_list, "stay");

        let json = ws.fail(&["card", "move", "--id", &card, "--list-id", &away_list]);
        assert_eq!(json["code"], "cross_board_move");

        let json = ws.ok(&["card", "get", "--id", &card]);
        assert_eq!(json["data"]["list_id"], home_list.as_str());
    }

    #[test]
    fn test_card_archive_and_restore_elsewhere() {
        let ws = Workspace::new();
        let board = ws.board("B");
        let todo = ws.list(&board, "Todo");
        let done = ws.list(&board, "Done");
        let card = ws.card(&todo, "task");

        let json = ws.ok(&["card", "archive", "--id", &card]);
        assert_eq!(json["data"]["archived"], true);
        assert!(ws.card_titles(&todo).is_empty());

        let json = ws.fail(&["card", "move", "--id", &card, "--list-id", &done]);
        assert_eq!(json["code"], "archived");

        let json = ws.ok(&["card", "restore", "--id", &card, "--list-id", &done]);
        assert_eq!(json["data"]["archived"], false);
        assert_eq!(ws.card_titles(&done), ["task"]);
    }

    #[test]
    fn test_list_normalize_reports() {
        let ws = Workspace::new();
        let board = ws.board("B");
        let list = ws.list(&board, "Todo");
        ws.card(&list, "a");

        let json = ws.ok(&["list", "normalize", "--id", &list]);
        assert_eq!(json["data"]["kind"], "list");
        assert_eq!(json["data"]["members"], 1);
    }
}

mod misc_tests {
    use super::*;

    #[test]
    fn test_missing_file_argument() {
        let dir = tempdir().unwrap();
        let output = kanban(dir.path())
            .args(["board", "list"])
            .assert()
            .failure()
            .code(1)
            .get_output()
            .stderr
            .clone();
        let json = parse_json_output(&output);
        assert!(json["error"].as_str().unwrap().contains("--file"));
    }

    #[test]
    fn test_file_from_env() {
        let ws = Workspace::new();
        ws.board("From flag");

        kanban(ws.dir.path())
            .env("KANBAN_FILE", ws.file())
            .args(["board", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("From flag"));
    }

    #[test]
    fn test_sweep_leaves_even_positions_alone() {
        let ws = Workspace::new();
        let board = ws.board("Sweep");
        let list = ws.list(&board, "Todo");
        ws.card(&list, "one");
        ws.card(&list, "two");

        let json = ws.ok(&["sweep"]);
        assert_eq!(json["data"]["count"], 0);
        assert_eq!(ws.card_titles(&list), vec!["one", "two"]);
    }

    #[test]
    fn test_sweep_watch_requires_interval() {
        let ws = Workspace::new();
        let json = ws.fail(&["sweep", "--watch"]);
        assert!(json["error"]
            .as_str()
            .unwrap()
            .contains("sweep_interval_secs"));
    }

    #[test]
    fn test_completions() {
        let dir = tempdir().unwrap();
        kanban(dir.path())
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("kanban"));
    }
}
