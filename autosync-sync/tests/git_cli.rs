//! `GitCli` against real repositories: a bare remote plus two clones.
//!
//! `alice` seeds the remote; `bob` is the working copy under sync.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use autosync_core::{MergeStrategy, RepositoryDescriptor, SyncJournal, SyncStatus};
use autosync_sync::{
    GitCli, GitError, GitTimeouts, RepositorySyncer, StatusRecorder, SyncOptions, VersionControl,
};
use tempfile::TempDir;

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("spawn git");
    assert!(
        output.status.success(),
        "git {:?} failed in {}: {}",
        args,
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn configure_identity(dir: &Path) {
    git(dir, &["config", "user.name", "Autosync Test"]);
    git(dir, &["config", "user.email", "autosync@example.com"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
}

fn write(dir: &Path, rel: &str, contents: &str) {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

fn commit_all(dir: &Path, message: &str) {
    git(dir, &["add", "-A"]);
    git(dir, &["commit", "-m", message]);
}

struct Remote {
    _tmp: TempDir,
    alice: PathBuf,
    bob: PathBuf,
}

impl Remote {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let bare = tmp.path().join("remote.git");
        let alice = tmp.path().join("alice");
        let bob = tmp.path().join("bob");
        std::fs::create_dir_all(&bare).unwrap();
        std::fs::create_dir_all(&alice).unwrap();

        git(&bare, &["init", "--bare", "--initial-branch=main"]);
        git(&alice, &["init", "--initial-branch=main"]);
        configure_identity(&alice);
        write(&alice, "notes.md", "line one\nline two\nline three\n");
        write(&alice, "doomed.md", "soon deleted upstream\n");
        commit_all(&alice, "initial");
        git(&alice, &["remote", "add", "origin", bare.to_str().unwrap()]);
        git(&alice, &["push", "-u", "origin", "main"]);

        git(
            tmp.path(),
            &["clone", bare.to_str().unwrap(), bob.to_str().unwrap()],
        );
        configure_identity(&bob);

        Self {
            _tmp: tmp,
            alice,
            bob,
        }
    }

    fn alice_pushes(&self, rel: &str, contents: &str) {
        write(&self.alice, rel, contents);
        commit_all(&self.alice, &format!("alice edits {rel}"));
        git(&self.alice, &["push", "origin", "main"]);
    }

    fn bob_file(&self, rel: &str) -> String {
        std::fs::read_to_string(self.bob.join(rel)).unwrap()
    }
}

fn cli() -> GitCli {
    let _ = env_logger::builder().is_test(true).try_init();
    GitCli::new().expect("runtime")
}

#[test]
fn fresh_clone_is_neither_behind_nor_ahead() {
    let remote = Remote::new();
    let vcs = cli();

    vcs.fetch(&remote.bob, "origin").unwrap();
    assert_eq!(vcs.count_behind(&remote.bob, "origin", "main").unwrap(), 0);
    assert_eq!(vcs.count_ahead(&remote.bob, "origin", "main").unwrap(), 0);
    assert!(!vcs.has_changes(&remote.bob).unwrap());
}

#[test]
fn fetch_from_unknown_remote_surfaces_diagnostic() {
    let remote = Remote::new();
    let err = cli().fetch(&remote.bob, "nowhere").unwrap_err();
    assert!(err.to_string().contains("nowhere"), "got: {err}");
}

#[test]
fn theirs_strategy_takes_incoming_lines() {
    let remote = Remote::new();
    let vcs = cli();
    remote.alice_pushes("notes.md", "line one\nALICE\nline three\n");
    write(&remote.bob, "notes.md", "line one\nBOB\nline three\n");
    commit_all(&remote.bob, "bob edits");

    vcs.fetch(&remote.bob, "origin").unwrap();
    assert_eq!(vcs.count_behind(&remote.bob, "origin", "main").unwrap(), 1);
    vcs.pull(&remote.bob, MergeStrategy::Theirs, "origin", "main")
        .unwrap();

    assert_eq!(remote.bob_file("notes.md"), "line one\nALICE\nline three\n");
    assert_eq!(vcs.count_behind(&remote.bob, "origin", "main").unwrap(), 0);
}

#[test]
fn ours_strategy_keeps_local_lines() {
    let remote = Remote::new();
    let vcs = cli();
    remote.alice_pushes("notes.md", "line one\nALICE\nline three\n");
    write(&remote.bob, "notes.md", "line one\nBOB\nline three\n");
    commit_all(&remote.bob, "bob edits");

    vcs.fetch(&remote.bob, "origin").unwrap();
    vcs.pull(&remote.bob, MergeStrategy::Ours, "origin", "main")
        .unwrap();

    assert_eq!(remote.bob_file("notes.md"), "line one\nBOB\nline three\n");
    // The merge commit plus bob's edit are now ahead of the remote.
    assert_eq!(vcs.count_ahead(&remote.bob, "origin", "main").unwrap(), 2);
}

#[test]
fn unresolvable_conflict_aborts_merge() {
    let remote = Remote::new();
    let vcs = cli();

    // modify/delete conflicts are not resolved by -X ours.
    git(&remote.alice, &["rm", "-q", "doomed.md"]);
    git(&remote.alice, &["commit", "-m", "alice deletes"]);
    git(&remote.alice, &["push", "origin", "main"]);
    write(&remote.bob, "doomed.md", "bob still needs this\n");
    commit_all(&remote.bob, "bob edits doomed");

    vcs.fetch(&remote.bob, "origin").unwrap();
    let err = vcs
        .pull(&remote.bob, MergeStrategy::Ours, "origin", "main")
        .unwrap_err();
    assert!(!err.to_string().is_empty());

    assert!(!vcs.merge_in_progress(&remote.bob).unwrap());
    assert_eq!(remote.bob_file("doomed.md"), "bob still needs this\n");
    assert!(!vcs.has_changes(&remote.bob).unwrap(), "working copy must be clean");
}

#[test]
fn staging_skips_logs_directory() {
    let remote = Remote::new();
    let vcs = cli();
    write(&remote.bob, "todo.md", "- ship it\n");
    write(&remote.bob, "logs/run.log", "noise\n");

    let staged = vcs
        .stage_all(&remote.bob, &[PathBuf::from("logs")])
        .unwrap();
    assert_eq!(staged, 1);

    let cached = git_names(&remote.bob, &["diff", "--cached", "--name-only"]);
    assert_eq!(cached, vec!["todo.md".to_string()]);
}

#[test]
fn commit_and_push_reach_the_remote() {
    let remote = Remote::new();
    let vcs = cli();
    write(&remote.bob, "todo.md", "- ship it\n");

    assert_eq!(vcs.stage_all(&remote.bob, &[]).unwrap(), 1);
    vcs.commit(&remote.bob, "Auto-sync: 1 file(s) updated").unwrap();
    assert_eq!(vcs.count_ahead(&remote.bob, "origin", "main").unwrap(), 1);

    vcs.push(&remote.bob, "origin", "main").unwrap();
    assert_eq!(vcs.count_ahead(&remote.bob, "origin", "main").unwrap(), 0);

    vcs.fetch(&remote.alice, "origin").unwrap();
    assert_eq!(vcs.count_behind(&remote.alice, "origin", "main").unwrap(), 1);
}

#[test]
fn push_refuses_to_discard_unseen_remote_commits() {
    let remote = Remote::new();
    let vcs = cli();
    remote.alice_pushes("alice.md", "from alice\n");
    write(&remote.bob, "bob.md", "from bob\n");
    commit_all(&remote.bob, "bob adds");

    // bob has not fetched alice's commit; the lease must reject the push.
    assert!(vcs.push(&remote.bob, "origin", "main").is_err());

    vcs.fetch(&remote.alice, "origin").unwrap();
    let log = git_names(&remote.alice, &["log", "--format=%s", "origin/main"]);
    assert_eq!(log.first().map(String::as_str), Some("alice edits alice.md"));
}

#[test]
fn syncer_round_trip_with_real_git() {
    let remote = Remote::new();
    let state = TempDir::new().unwrap();
    remote.alice_pushes("notes.md", "line one\nALICE\nline three\n");
    write(&remote.bob, "todo.md", "- ship it\n");
    write(&remote.bob, "logs/run.log", "noise\n");

    let vcs = cli();
    let journal = SyncJournal::new(state.path().join("git-sync.log"), false);
    let recorder = StatusRecorder::new(state.path().join("last-sync.json"));
    let options = SyncOptions {
        pacing: Duration::ZERO,
        ..SyncOptions::default()
    };
    let outcome = RepositorySyncer::new(&vcs, &journal, &recorder, &options)
        .sync(&RepositoryDescriptor::new(&remote.bob));

    assert_eq!(outcome.status, SyncStatus::Success, "{}", std::fs::read_to_string(journal.path()).unwrap());
    assert_eq!(remote.bob_file("notes.md"), "line one\nALICE\nline three\n");

    vcs.fetch(&remote.alice, "origin").unwrap();
    assert_eq!(vcs.count_behind(&remote.alice, "origin", "main").unwrap(), 1);
    let status = git_names(&remote.bob, &["status", "--porcelain"]);
    assert_eq!(status, vec!["?? logs/".to_string()]);
}

#[test]
fn unpushed_branch_counts_as_missing_remote_branch() {
    let remote = Remote::new();
    let vcs = cli();
    git(&remote.bob, &["checkout", "-q", "-b", "feature"]);

    vcs.fetch(&remote.bob, "origin").unwrap();
    let err = vcs
        .count_behind(&remote.bob, "origin", "feature")
        .unwrap_err();
    assert!(
        matches!(&err, GitError::MissingRemoteBranch { reference } if reference == "origin/feature"),
        "got: {err}"
    );
}

#[test]
fn pull_timeout_fails_repository_without_leaving_a_merge() {
    let remote = Remote::new();
    let state = TempDir::new().unwrap();
    remote.alice_pushes("notes.md", "line one\nALICE\nline three\n");

    let _ = env_logger::builder().is_test(true).try_init();
    let vcs = GitCli::with_timeouts(GitTimeouts {
        pull: Duration::from_nanos(1),
        ..GitTimeouts::default()
    })
    .expect("runtime");
    let journal = SyncJournal::new(state.path().join("git-sync.log"), false);
    let recorder = StatusRecorder::new(state.path().join("last-sync.json"));
    let options = SyncOptions {
        pacing: Duration::ZERO,
        ..SyncOptions::default()
    };
    let outcome = RepositorySyncer::new(&vcs, &journal, &recorder, &options)
        .sync(&RepositoryDescriptor::new(&remote.bob));

    let log = std::fs::read_to_string(journal.path()).unwrap();
    assert_eq!(outcome.status, SyncStatus::Failed, "{log}");
    assert_eq!(outcome.message, "Pull failed");
    assert!(log.contains("| ERROR | Pull failed: git pull"), "{log}");
    assert!(log.contains("timed out"), "{log}");
    assert!(!vcs.merge_in_progress(&remote.bob).unwrap());

    let recorded = recorder.load().unwrap().expect("recorded");
    assert_eq!(recorded.message, "Pull failed");
}

fn git_names(dir: &Path, args: &[&str]) -> Vec<String> {
    git(dir, args)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(str::to_owned)
        .collect()
}
