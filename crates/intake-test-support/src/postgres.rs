//! Disposable Postgres databases for catalog integration tests.
//!
//! `INTAKE_TEST_DATABASE_URL` points at an existing server; otherwise local
//! `initdb`/`postgres`/`pg_isready` binaries are used to start a throwaway
//! cluster in a temporary directory. Callers skip their tests when this fails.

use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::str::FromStr;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow, bail};
use postgres::NoTls;
use tempfile::TempDir;
use url::Url;

/// Environment variable naming an existing server to create databases on.
pub const DATABASE_URL_ENV: &str = "INTAKE_TEST_DATABASE_URL";

const SEARCH_DIRS: &[&str] = &[
    "/usr/lib/postgresql/17/bin",
    "/usr/lib/postgresql/16/bin",
    "/opt/homebrew/opt/postgresql@16/bin",
    "/usr/local/bin",
];

/// A uniquely named database, dropped together with any server started for it.
pub struct TestDatabase {
    connection_string: String,
    admin_url: String,
    database: String,
    _server: Option<LocalServer>,
}

struct LocalServer {
    process: Child,
    _data_dir: TempDir,
}

impl TestDatabase {
    /// Connection string for `sqlx` or other Postgres clients.
    #[must_use]
    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }
}

impl Drop for TestDatabase {
    fn drop(&mut self) {
        let _ = run_admin(
            &self.admin_url,
            format!("DROP DATABASE IF EXISTS \"{}\"", self.database),
        );
    }
}

impl Drop for LocalServer {
    fn drop(&mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

/// Create a fresh database.
///
/// # Errors
///
/// Returns an error when no server URL is configured and a local server
/// cannot be started, or when the database cannot be created.
pub fn start_postgres() -> Result<TestDatabase> {
    if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
        return create_database(&url, None);
    }

    let (server, port) = start_local_server()?;
    let url = format!("postgres://postgres@127.0.0.1:{port}/postgres");
    create_database(&url, Some(server))
}

fn start_local_server() -> Result<(LocalServer, u16)> {
    let initdb = find_binary("initdb")?;
    let postgres = find_binary("postgres")?;
    let pg_isready = find_binary("pg_isready")?;

    let data_dir = tempfile::tempdir().context("failed to create postgres data dir")?;
    let data_path = data_dir
        .path()
        .to_str()
        .context("data dir contains non-utf8 characters")?
        .to_string();

    let status = Command::new(&initdb)
        .args(["-D", &data_path, "--username=postgres", "--auth=trust"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .context("failed to run initdb")?;
    if !status.success() {
        bail!("initdb exited with failure status");
    }

    let port = free_port()?;
    let process = Command::new(&postgres)
        .args(["-D", &data_path, "-p", &port.to_string(), "-h", "127.0.0.1"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .context("failed to start postgres")?;
    let server = LocalServer {
        process,
        _data_dir: data_dir,
    };

    wait_until_ready(&pg_isready, port)?;
    Ok((server, port))
}

fn find_binary(name: &str) -> Result<PathBuf> {
    let path_dirs =
        std::env::var_os("PATH").map_or_else(Vec::new, |paths| std::env::split_paths(&paths).collect());
    SEARCH_DIRS
        .iter()
        .map(PathBuf::from)
        .chain(path_dirs)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.exists())
        .ok_or_else(|| anyhow!("{name} binary is required for Postgres tests"))
}

fn free_port() -> Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0").context("failed to reserve port")?;
    Ok(listener
        .local_addr()
        .context("failed to read listener address")?
        .port())
}

fn wait_until_ready(pg_isready: &Path, port: u16) -> Result<()> {
    for _ in 0..30 {
        let ready = Command::new(pg_isready)
            .args(["-h", "127.0.0.1", "-p", &port.to_string(), "-U", "postgres"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success());
        if ready {
            return Ok(());
        }
        thread::sleep(Duration::from_millis(200));
    }
    bail!("postgres did not become ready in time")
}

fn create_database(base_url: &str, server: Option<LocalServer>) -> Result<TestDatabase> {
    let parsed = Url::parse(base_url).context("invalid postgres connection url")?;
    let database = unique_name();

    let mut admin = parsed.clone();
    admin.set_path("/postgres");
    let admin_url = admin.to_string();
    run_admin(&admin_url, format!("CREATE DATABASE \"{database}\""))
        .context("failed to create test database")?;

    let mut target = parsed;
    target.set_path(&format!("/{database}"));
    Ok(TestDatabase {
        connection_string: target.to_string(),
        admin_url,
        database,
        _server: server,
    })
}

// The blocking client spins up its own runtime, so it must not run on a tokio worker.
fn run_admin(admin_url: &str, statement: String) -> Result<()> {
    let admin_url = admin_url.to_string();
    thread::spawn(move || -> Result<()> {
        let mut client = postgres::Config::from_str(&admin_url)?.connect(NoTls)?;
        client.simple_query(&statement)?;
        Ok(())
    })
    .join()
    .unwrap_or_else(|_| Err(anyhow!("admin statement thread panicked")))
}

fn unique_name() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("intake_test_{}_{nanos}", std::process::id())
}
