//! End-to-end dispatch runs against a recording transport

use async_trait::async_trait;
use clap::Parser;
use mail_dispatch::cli::Cli;
use mail_dispatch::config::Settings;
use mail_dispatch::dispatch::run_with_transport;
use mail_dispatch::mime::ComposedMessage;
use mail_dispatch::smtp::{Transport, TransportError};
use mail_dispatch::{DeliveryTally, DispatchError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Transport double that keeps every message it is handed
#[derive(Default)]
struct RecordingTransport {
    connected: bool,
    connects: usize,
    closes: usize,
    refuse_connect: bool,
    fail_for: HashSet<String>,
    sent: Vec<ComposedMessage>,
}

impl RecordingTransport {
    fn failing_for(addresses: &[&str]) -> Self {
        Self {
            fail_for: addresses.iter().map(|a| a.to_string()).collect(),
            ..Self::default()
        }
    }

    fn recipients(&self) -> Vec<&str> {
        self.sent.iter().map(|m| m.to_address()).collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.connects += 1;
        if self.refuse_connect {
            return Err(TransportError::Connect("refused".to_string()));
        }
        self.connected = true;
        Ok(())
    }

    async fn send(&mut self, message: &ComposedMessage) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        if self.fail_for.contains(message.to_address()) {
            return Err(TransportError::Send("550 mailbox unavailable".to_string()));
        }
        self.sent.push(message.clone());
        Ok(())
    }

    async fn close(&mut self) {
        self.connected = false;
        self.closes += 1;
    }
}

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn path_str(path: &Path) -> String {
    path.to_str().unwrap().to_string()
}

/// Live settings with test credentials and no process environment
fn settings(args: &[String]) -> Settings {
    let mut argv = vec![
        "mail-dispatch".to_string(),
        "--username".to_string(),
        "team@example.com".to_string(),
        "--password".to_string(),
        "secret".to_string(),
    ];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).unwrap();
    Settings::resolve_with_env(&cli, Some(Default::default())).unwrap()
}

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

const LIST: &str = "\
email,name,consent
ann@example.com,Ann,yes
bob@example.com,Bob,no
not-an-email,Nobody,yes
ann@example.com,Ann again,yes
cy@example.com,,Y
dee@example.com,Dee,
";

#[tokio::test]
async fn test_csv_run_applies_every_gate() {
    let dir = TempDir::new().unwrap();
    let csv = write(&dir, "list.csv", LIST);
    let settings = settings(&args(&["--csv", &path_str(&csv)]));

    let mut transport = RecordingTransport::default();
    let tally = run_with_transport(&settings, Some(&mut transport)).await.unwrap();

    assert_eq!(
        tally,
        DeliveryTally {
            total: 6,
            sent: 2,
            skipped: 4
        }
    );
    assert_eq!(transport.recipients(), vec!["ann@example.com", "cy@example.com"]);
    assert_eq!(transport.connects, 1);
    assert_eq!(transport.closes, 1);
}

#[tokio::test]
async fn test_bodies_are_personalised() {
    let dir = TempDir::new().unwrap();
    let csv = write(&dir, "list.csv", LIST);
    let settings = settings(&args(&["--csv", &path_str(&csv)]));

    let mut transport = RecordingTransport::default();
    run_with_transport(&settings, Some(&mut transport)).await.unwrap();

    let ann = &transport.sent[0];
    assert_eq!(ann.text_body(), Some("Hi Ann,\n\nThis is a friendly message.\n"));
    assert_eq!(
        ann.html_body(),
        Some("<p>Hi <strong>Ann</strong>,</p><p>This is a friendly message.</p>")
    );
    assert_eq!(ann.header("Subject"), Some("Hello from Example"));
    assert!(ann.header("From").unwrap().contains("team@example.com"));

    // Empty display name falls back to the address
    let cy = &transport.sent[1];
    assert_eq!(cy.text_body(), Some("Hi cy@example.com,\n\nThis is a friendly message.\n"));
}

#[tokio::test]
async fn test_duplicate_wins_over_later_consent() {
    let dir = TempDir::new().unwrap();
    let csv = write(
        &dir,
        "list.csv",
        "email,name,consent\nann@example.com,Ann,no\nann@example.com,Ann,yes\n",
    );
    let settings = settings(&args(&["--csv", &path_str(&csv)]));

    let mut transport = RecordingTransport::default();
    let tally = run_with_transport(&settings, Some(&mut transport)).await.unwrap();

    assert_eq!(tally.sent, 0);
    assert_eq!(tally.skipped, 2);
    assert!(transport.sent.is_empty());
}

#[tokio::test]
async fn test_consent_can_be_disabled() {
    let dir = TempDir::new().unwrap();
    let csv = write(&dir, "list.csv", LIST);
    let settings = settings(&args(&["--csv", &path_str(&csv), "--no-require-consent"]));

    let mut transport = RecordingTransport::default();
    let tally = run_with_transport(&settings, Some(&mut transport)).await.unwrap();

    assert_eq!(tally.sent, 4);
    assert_eq!(
        transport.recipients(),
        vec![
            "ann@example.com",
            "bob@example.com",
            "cy@example.com",
            "dee@example.com"
        ]
    );
}

#[tokio::test]
async fn test_single_recipient_is_never_consent_gated() {
    let settings = settings(&args(&["--to", "solo@example.com", "--name", "Solo"]));

    let mut transport = RecordingTransport::default();
    let tally = run_with_transport(&settings, Some(&mut transport)).await.unwrap();

    assert_eq!(tally.sent, 1);
    assert_eq!(
        transport.sent[0].text_body(),
        Some("Hi Solo,\n\nThis is a friendly message.\n")
    );
}

#[tokio::test]
async fn test_custom_columns_fill_placeholders() {
    let dir = TempDir::new().unwrap();
    let csv = write(
        &dir,
        "list.csv",
        "email,name,consent,plan\nann@example.com,Ann,yes,Gold\n",
    );
    let text = write(&dir, "body.txt", "Dear {name} ({email}), plan: {plan} {{not a var}}");
    let settings = settings(&args(&[
        "--csv",
        &path_str(&csv),
        "--template-text",
        &path_str(&text),
    ]));

    let mut transport = RecordingTransport::default();
    run_with_transport(&settings, Some(&mut transport)).await.unwrap();

    assert_eq!(
        transport.sent[0].text_body(),
        Some("Dear Ann (ann@example.com), plan: Gold {not a var}")
    );
}

#[tokio::test]
async fn test_missing_variable_aborts_and_closes_transport() {
    let dir = TempDir::new().unwrap();
    let csv = write(&dir, "list.csv", LIST);
    let text = write(&dir, "body.txt", "Hi {name}, use {coupon}");
    let settings = settings(&args(&[
        "--csv",
        &path_str(&csv),
        "--template-text",
        &path_str(&text),
    ]));

    let mut transport = RecordingTransport::default();
    let result = run_with_transport(&settings, Some(&mut transport)).await;

    assert!(matches!(result, Err(DispatchError::MissingVariable(ref v)) if v == "coupon"));
    assert!(transport.sent.is_empty());
    assert_eq!(transport.closes, 1);
}

#[tokio::test]
async fn test_unreadable_template_fails_before_connecting() {
    let settings = settings(&args(&[
        "--to",
        "ann@example.com",
        "--template-html",
        "/nonexistent/body.html",
    ]));

    let mut transport = RecordingTransport::default();
    let result = run_with_transport(&settings, Some(&mut transport)).await;

    assert!(matches!(result, Err(DispatchError::TemplateRead { .. })));
    assert_eq!(transport.connects, 0);
}

#[tokio::test]
async fn test_connect_failure_is_fatal() {
    let settings = settings(&args(&["--to", "ann@example.com"]));

    let mut transport = RecordingTransport {
        refuse_connect: true,
        ..RecordingTransport::default()
    };
    let result = run_with_transport(&settings, Some(&mut transport)).await;

    assert!(matches!(result, Err(DispatchError::Transport(TransportError::Connect(_)))));
    assert!(transport.sent.is_empty());
}

#[tokio::test]
async fn test_send_failure_only_skips_that_recipient() {
    let dir = TempDir::new().unwrap();
    let csv = write(
        &dir,
        "list.csv",
        "email,consent\na@example.com,yes\nb@example.com,yes\nc@example.com,yes\n",
    );
    let settings = settings(&args(&["--csv", &path_str(&csv)]));

    let mut transport = RecordingTransport::failing_for(&["b@example.com"]);
    let tally = run_with_transport(&settings, Some(&mut transport)).await.unwrap();

    assert_eq!(
        tally,
        DeliveryTally {
            total: 3,
            sent: 2,
            skipped: 1
        }
    );
    assert_eq!(transport.recipients(), vec!["a@example.com", "c@example.com"]);
}

#[tokio::test]
async fn test_missing_resources_do_not_block_delivery() {
    let dir = TempDir::new().unwrap();
    let terms = write(&dir, "terms.txt", "terms and conditions");
    let logo = write(&dir, "logo.png", "not really a png");
    let html = write(&dir, "body.html", "<p>Hi {name}</p><img src=\"cid:logo.png\">");
    let settings = settings(&args(&[
        "--to",
        "ann@example.com",
        "--template-html",
        &path_str(&html),
        "--attach",
        "/nonexistent/brochure.pdf",
        "--attach",
        &path_str(&terms),
        "--inline",
        &path_str(&logo),
        "--inline",
        "/nonexistent/banner.png",
    ]));

    let mut transport = RecordingTransport::default();
    let tally = run_with_transport(&settings, Some(&mut transport)).await.unwrap();

    assert_eq!(tally.sent, 1);
    let message = &transport.sent[0];
    let names: Vec<_> = message.parts().iter().map(|p| p.filename.as_str()).collect();
    assert_eq!(names, vec!["logo.png", "terms.txt"]);
    assert_eq!(message.content_ids(), vec!["logo.png"]);

    let raw = String::from_utf8_lossy(&message.formatted()).into_owned();
    assert!(raw.contains("multipart/mixed"));
    assert!(raw.contains("multipart/alternative"));
    assert!(raw.contains("<logo.png>"));
}

#[tokio::test]
async fn test_optional_headers_reach_the_wire() {
    let settings = settings(&args(&[
        "--to",
        "ann@example.com",
        "--reply-to",
        "help@example.com",
        "--unsubscribe",
        "<mailto:unsubscribe@example.com>",
        "--subject",
        "Your invoice",
    ]));

    let mut transport = RecordingTransport::default();
    run_with_transport(&settings, Some(&mut transport)).await.unwrap();

    let raw = String::from_utf8_lossy(&transport.sent[0].formatted()).into_owned();
    assert!(raw.contains("Subject: Your invoice"));
    assert!(raw.contains("Reply-To: help@example.com"));
    assert!(raw.contains("List-Unsubscribe: <mailto:unsubscribe@example.com>"));
}

#[tokio::test]
async fn test_dry_run_never_touches_transport_and_is_repeatable() {
    let dir = TempDir::new().unwrap();
    let csv = write(&dir, "list.csv", LIST);

    let mut tallies = Vec::new();
    for run in ["first", "second"] {
        let eml_dir = dir.path().join(run);
        let settings = settings(&args(&[
            "--csv",
            &path_str(&csv),
            "--dry-run",
            "--save-eml-dir",
            &path_str(&eml_dir),
        ]));

        let mut transport = RecordingTransport::default();
        let tally = run_with_transport(&settings, Some(&mut transport)).await.unwrap();
        assert_eq!(transport.connects, 0);
        assert_eq!(transport.closes, 0);
        assert!(transport.sent.is_empty());

        let mut files: Vec<String> = std::fs::read_dir(&eml_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        files.sort();
        assert_eq!(files.len(), 2);
        assert!(files[0].starts_with("ann_example.com_"));
        assert!(files[0].ends_with(".eml"));
        assert!(files[1].starts_with("cy_example.com_"));

        tallies.push(tally);
    }

    assert_eq!(tallies[0], tallies[1]);
    assert_eq!(tallies[0].to_string(), "total=6 sent=2 skipped=4");
}

#[tokio::test]
async fn test_saved_eml_matches_sent_message() {
    let dir = TempDir::new().unwrap();
    let eml_dir = dir.path().join("out");
    let settings = settings(&args(&[
        "--to",
        "ann@example.com",
        "--save-eml-dir",
        &path_str(&eml_dir),
    ]));

    let mut transport = RecordingTransport::default();
    run_with_transport(&settings, Some(&mut transport)).await.unwrap();

    let entry = std::fs::read_dir(&eml_dir).unwrap().next().unwrap().unwrap();
    let saved = std::fs::read(entry.path()).unwrap();
    assert_eq!(saved, transport.sent[0].formatted());
}

#[tokio::test]
async fn test_unreadable_csv_is_fatal() {
    let settings = settings(&args(&["--csv", "/nonexistent/list.csv"]));

    let mut transport = RecordingTransport::default();
    let result = run_with_transport(&settings, Some(&mut transport)).await;

    assert!(matches!(result, Err(DispatchError::Csv(_))));
    assert!(transport.sent.is_empty());
    assert_eq!(transport.closes, 1);
}

#[tokio::test]
async fn test_reply_to_list_is_delivered() {
    let settings = settings(&args(&[
        "--to",
        "ann@example.com",
        "--reply-to",
        "help@example.com, sales@example.com",
    ]));

    let mut transport = RecordingTransport::default();
    let tally = run_with_transport(&settings, Some(&mut transport)).await.unwrap();

    assert_eq!(tally.sent, 1);
    let raw = String::from_utf8_lossy(&transport.sent[0].formatted()).into_owned();
    assert!(raw.contains("Reply-To: "));
    assert!(raw.contains("sales@example.com"));
}

#[test]
fn test_bad_run_options_fail_at_startup() {
    for extra in [
        ["--reply-to", "not an address"],
        ["--rate-per-minute", "1e-300"],
    ] {
        let cli = Cli::try_parse_from(
            ["mail-dispatch", "--to", "ann@example.com", "--dry-run"]
                .into_iter()
                .chain(extra),
        )
        .unwrap();
        let result = Settings::resolve_with_env(&cli, Some(Default::default()));
        assert!(matches!(result, Err(DispatchError::Config(_))), "{extra:?}");
    }
}
