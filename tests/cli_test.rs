//! CLI Command Tests
//!
//! Argument parsing plus command handlers over a temporary file store.
//! Covers JSON output format, exit codes, and input validation.

// =============================================================================
// CLI Argument Parsing Tests
// =============================================================================

mod cli_parsing {
    use clap::Parser;
    use episodeplay::cli::{
        setting_key, setting_value, Cli, Command, ModeArg, ProgressAction, SettingsAction,
    };

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["episodeplay"]).is_err());
    }

    #[test]
    fn test_resolve_subs_with_mode() {
        let cli = Cli::parse_from([
            "episodeplay",
            "resolve-subs",
            "tracks.json",
            "--mode",
            "dub",
            "-p",
            "Spanish",
        ]);
        match cli.command {
            Command::ResolveSubs(cmd) => {
                assert_eq!(cmd.file.to_str(), Some("tracks.json"));
                assert_eq!(cmd.mode, Some(ModeArg::Dub));
                assert_eq!(cmd.preferred.as_deref(), Some("Spanish"));
            }
            _ => panic!("Expected ResolveSubs command"),
        }
    }

    #[test]
    fn test_subs_alias() {
        let cli = Cli::parse_from(["episodeplay", "subs", "tracks.json"]);
        assert!(matches!(cli.command, Command::ResolveSubs(_)));
    }

    #[test]
    fn test_select_server_unavailable_list() {
        let cli = Cli::parse_from([
            "episodeplay",
            "select-server",
            "hd-1",
            "megacloud",
            "--unavailable",
            "hd-2,hd-3",
        ]);
        match cli.command {
            Command::SelectServer(cmd) => {
                assert_eq!(cmd.servers, vec!["hd-1", "megacloud"]);
                assert_eq!(cmd.unavailable, vec!["hd-2", "hd-3"]);
            }
            _ => panic!("Expected SelectServer command"),
        }
    }

    #[test]
    fn test_switch_server_no_sync() {
        let cli = Cli::parse_from(["episodeplay", "switch-server", "hd-2", "--no-sync"]);
        match cli.command {
            Command::SwitchServer(cmd) => {
                assert_eq!(cmd.name, "hd-2");
                assert!(cmd.no_sync);
            }
            _ => panic!("Expected SwitchServer command"),
        }
    }

    #[test]
    fn test_progress_show_default_variant() {
        let cli = Cli::parse_from(["episodeplay", "progress", "show", "frieren-18542", "3"]);
        match cli.command {
            Command::Progress(cmd) => match cmd.action {
                ProgressAction::Show {
                    anime_id,
                    episode_id,
                    variant,
                } => {
                    assert_eq!(anime_id, "frieren-18542");
                    assert_eq!(episode_id, "3");
                    assert_eq!(variant, "default");
                }
                _ => panic!("Expected Show action"),
            },
            _ => panic!("Expected Progress command"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["episodeplay", "settings", "show", "--json", "-q"]);
        assert!(cli.json);
        assert!(cli.quiet);
        assert!(matches!(
            cli.command,
            Command::Settings(ref cmd) if matches!(cmd.action, SettingsAction::Show)
        ));
    }

    #[test]
    fn test_setting_key_normalization() {
        assert_eq!(setting_key("skip-intro"), "skipIntro");
        assert_eq!(setting_key("force_subtitles_off"), "forceSubtitlesOff");
        assert_eq!(setting_key("autoplayNext"), "autoplayNext");
    }

    #[test]
    fn test_setting_value_parsing() {
        assert_eq!(setting_value("true"), serde_json::json!(true));
        assert_eq!(setting_value("0.4"), serde_json::json!(0.4));
        assert_eq!(setting_value("Spanish"), serde_json::json!("Spanish"));
    }
}

// =============================================================================
// Command Handler Tests
// =============================================================================

mod handlers {
    use std::io::Write;
    use std::path::Path;
    use std::sync::Arc;

    use episodeplay::cli::{
        ExitCode, Output, ProgressAction, ProgressCmd, ReplayCmd, ResolveSubsCmd,
        SelectServerCmd, SettingsAction, SettingsCmd, SwitchServerCmd,
    };
    use episodeplay::commands;
    use episodeplay::config::Config;
    use episodeplay::models::{ProgressKey, ProgressRecord};
    use episodeplay::player::{ProgressStore, ServerSelector};
    use episodeplay::settings::SettingsStore;
    use episodeplay::storage::{FileStore, KeyValueStore};
    use tempfile::TempDir;

    fn quiet() -> Output {
        Output {
            json: true,
            quiet: true,
        }
    }

    fn file_store(dir: &TempDir) -> Arc<dyn KeyValueStore> {
        Arc::new(FileStore::open(dir.path().join("store.json")).unwrap())
    }

    fn write_json(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_open_store_uses_override() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("override.json");
        let store = commands::open_store(Some(&path), &Config::default()).unwrap();
        store.set("preferredServer", "hd-1").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_resolve_subs_from_descriptor_array() {
        let dir = TempDir::new().unwrap();
        let file = write_json(
            dir.path(),
            "tracks.json",
            r#"[
                {"file": "https://cdn.test/eng-2.vtt", "label": "english", "kind": "captions"},
                {"file": "https://cdn.test/thumbs.vtt", "kind": "metadata"}
            ]"#,
        );
        let cmd = ResolveSubsCmd {
            file,
            mode: None,
            preferred: None,
        };
        assert_eq!(
            commands::resolve_subs_cmd(cmd, file_store(&dir), &quiet()),
            ExitCode::Success
        );
    }

    #[test]
    fn test_resolve_subs_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let file = write_json(dir.path(), "tracks.json", "not json");
        let cmd = ResolveSubsCmd {
            file,
            mode: None,
            preferred: None,
        };
        assert_eq!(
            commands::resolve_subs_cmd(cmd, file_store(&dir), &quiet()),
            ExitCode::InvalidArgs
        );
    }

    #[test]
    fn test_resolve_subs_missing_file() {
        let dir = TempDir::new().unwrap();
        let cmd = ResolveSubsCmd {
            file: dir.path().join("nope.json"),
            mode: None,
            preferred: None,
        };
        assert_eq!(
            commands::resolve_subs_cmd(cmd, file_store(&dir), &quiet()),
            ExitCode::InvalidArgs
        );
    }

    #[test]
    fn test_switch_then_select_uses_preference() {
        let dir = TempDir::new().unwrap();
        let store = file_store(&dir);
        let rt = tokio::runtime::Runtime::new().unwrap();
        let cmd = SwitchServerCmd {
            name: "megacloud".into(),
            no_sync: true,
        };
        assert_eq!(
            rt.block_on(commands::switch_server_cmd(
                cmd,
                store.clone(),
                &Config::default(),
                &quiet()
            )),
            ExitCode::Success
        );

        // Survives reopening the file
        let reopened = file_store(&dir);
        assert_eq!(
            ServerSelector::new(reopened.clone()).preferred().as_deref(),
            Some("megacloud")
        );
        let cmd = SelectServerCmd {
            servers: vec!["hd-2".into(), "megacloud".into()],
            unavailable: vec![],
        };
        assert_eq!(
            commands::select_server_cmd(cmd, reopened, &quiet()),
            ExitCode::Success
        );
    }

    #[test]
    fn test_switch_server_rejects_blank_name() {
        let dir = TempDir::new().unwrap();
        let rt = tokio::runtime::Runtime::new().unwrap();
        let cmd = SwitchServerCmd {
            name: "  ".into(),
            no_sync: true,
        };
        assert_eq!(
            rt.block_on(commands::switch_server_cmd(
                cmd,
                file_store(&dir),
                &Config::default(),
                &quiet()
            )),
            ExitCode::InvalidArgs
        );
    }

    #[test]
    fn test_progress_clear_per_anime() {
        let dir = TempDir::new().unwrap();
        let store = file_store(&dir);
        let progress = ProgressStore::new(store.clone());
        for (anime, episode) in [("frieren-18542", "1"), ("frieren-18542", "2"), ("bocchi-17811", "1")] {
            let mut record = ProgressRecord::empty(anime, None);
            record.watched = 120.0;
            record.total = 1440.0;
            progress
                .put(&ProgressKey::new(anime, episode, "sub"), &record)
                .unwrap();
        }

        let cmd = ProgressCmd {
            action: ProgressAction::Clear {
                anime: Some("frieren-18542".into()),
            },
        };
        assert_eq!(commands::progress_cmd(cmd, store.clone(), &quiet()), ExitCode::Success);

        let left = progress.list(None).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].0, "bocchi-17811_1_sub");
    }

    #[test]
    fn test_progress_show_missing_is_zeroed() {
        let dir = TempDir::new().unwrap();
        let cmd = ProgressCmd {
            action: ProgressAction::Show {
                anime_id: "frieren-18542".into(),
                episode_id: "9".into(),
                variant: "sub".into(),
            },
        };
        assert_eq!(
            commands::progress_cmd(cmd, file_store(&dir), &quiet()),
            ExitCode::Success
        );
    }

    #[test]
    fn test_settings_set_string_value() {
        let dir = TempDir::new().unwrap();
        let store = file_store(&dir);
        let cmd = SettingsCmd {
            action: SettingsAction::Set {
                key: "subtitle-language".into(),
                value: "Spanish".into(),
            },
        };
        assert_eq!(commands::settings_cmd(cmd, store.clone(), &quiet()), ExitCode::Success);
        assert_eq!(SettingsStore::new(store).load().subtitle_language, "Spanish");
    }

    #[test]
    fn test_replay_failed_session_exit_code() {
        let dir = TempDir::new().unwrap();
        let script = write_json(
            dir.path(),
            "script.json",
            r#"{"config": {"animeId": "frieren-18542", "episodeId": "1"}}"#,
        );
        let cmd = ReplayCmd {
            script,
            touch: false,
        };
        assert_eq!(
            commands::replay_cmd(cmd, &Config::default(), &quiet()),
            ExitCode::PlaybackFailed
        );
    }

    #[test]
    fn test_replay_success() {
        let dir = TempDir::new().unwrap();
        let script = write_json(
            dir.path(),
            "script.json",
            r#"{
                "config": {"manifestUrl": "https://cdn.test/master.m3u8", "animeId": "frieren-18542", "episodeId": "1"},
                "duration": 60,
                "steps": [
                    {"atMs": 0, "media": {"type": "ready"}},
                    {"atMs": 0, "media": {"type": "playing"}}
                ],
                "untilMs": 3000
            }"#,
        );
        let cmd = ReplayCmd {
            script,
            touch: false,
        };
        assert_eq!(
            commands::replay_cmd(cmd, &Config::default(), &quiet()),
            ExitCode::Success
        );
    }
}

// =============================================================================
// Backend Command Tests
// =============================================================================

mod backend {
    use episodeplay::cli::{ExitCode, Output};
    use episodeplay::commands;
    use episodeplay::config::Config;
    use mockito::Server;

    fn quiet() -> Output {
        Output {
            json: true,
            quiet: true,
        }
    }

    fn config_for(url: String) -> Config {
        Config {
            api_base_url: Some(url),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_whoami_signed_in() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/me")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"username":"fern"}"#)
            .create_async()
            .await;

        let code = commands::whoami_cmd(&config_for(server.url()), &quiet()).await;
        assert_eq!(code, ExitCode::Success);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_whoami_signed_out() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/me")
            .with_status(401)
            .create_async()
            .await;

        let code = commands::whoami_cmd(&config_for(server.url()), &quiet()).await;
        assert_eq!(code, ExitCode::NotSignedIn);
    }

    #[tokio::test]
    async fn test_whoami_backend_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/me")
            .with_status(502)
            .create_async()
            .await;

        let code = commands::whoami_cmd(&config_for(server.url()), &quiet()).await;
        assert_eq!(code, ExitCode::NetworkError);
    }
}
