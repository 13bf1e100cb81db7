//! Connection parameters and client-tool command builders.

use std::path::Path;

use upr_exec::CommandSpec;

/// One PostgreSQL endpoint (source or destination). Immutable once parsed
/// from flags/prompts.
#[derive(Debug, Clone)]
pub struct DbEndpoint {
    pub host: String,
    pub port: u16,
    pub user: String,
    password: String,
}

impl DbEndpoint {
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
        }
    }

    fn base(&self, program: &str) -> CommandSpec {
        CommandSpec::new(program)
            .args(["-h", &self.host])
            .args(["-p", &self.port.to_string()])
            .args(["-U", &self.user])
            .env("PGPASSWORD", &self.password)
    }

    /// `psql` running a single SQL command against `database`, tuple-only
    /// unaligned output for machine parsing.
    #[must_use]
    pub fn psql(&self, database: &str, sql: &str) -> CommandSpec {
        self.base("psql")
            .args(["-d", database])
            .args(["-X", "-q", "-tA"])
            .args(["-v", "ON_ERROR_STOP=1"])
            .args(["-c", sql])
    }

    /// `psql` replaying a SQL script from stdin. Statement errors do not stop
    /// the script (used for globals replay, where collisions are expected).
    #[must_use]
    pub fn psql_script(&self, database: &str, script: impl Into<String>) -> CommandSpec {
        self.base("psql")
            .args(["-d", database])
            .args(["-X", "-q"])
            .stdin(script)
    }

    /// `pg_dump` of one database to a custom-format archive. Ownership and
    /// privilege statements are excluded so restored objects land owned by
    /// the destination user.
    #[must_use]
    pub fn pg_dump(&self, database: &str, archive: &Path) -> CommandSpec {
        self.base("pg_dump")
            .args(["-Fc", "--no-owner", "--no-acl"])
            .args(["-f", &archive.display().to_string()])
            .arg(database)
    }

    /// `pg_dumpall --globals-only`: roles and tablespaces.
    #[must_use]
    pub fn pg_dumpall_globals(&self) -> CommandSpec {
        self.base("pg_dumpall").arg("--globals-only")
    }

    /// `pg_restore` of an archive into `database`. Without `-e` it continues
    /// past statement-level errors; a partial restore beats none.
    #[must_use]
    pub fn pg_restore(&self, database: &str, archive: &Path) -> CommandSpec {
        self.base("pg_restore")
            .args(["-d", database])
            .args(["--no-owner", "--no-acl"])
            .arg(archive.display().to_string())
    }
}

/// Double-quote an SQL identifier, doubling embedded quotes.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Single-quote an SQL string literal, doubling embedded quotes.
#[must_use]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn endpoint() -> DbEndpoint {
        DbEndpoint::new("db.example", 5432, "postgres", "hunter2")
    }

    #[test]
    fn password_goes_to_env_not_argv() {
        let spec = endpoint().psql("postgres", "SELECT 1");
        assert!(!spec.args.iter().any(|arg| arg.contains("hunter2")));
        assert_eq!(
            spec.envs,
            vec![("PGPASSWORD".to_string(), "hunter2".to_string())]
        );
    }

    #[test]
    fn dump_excludes_ownership() {
        let spec = endpoint().pg_dump("app", Path::new("/tmp/app.dump"));
        assert!(spec.args.contains(&"--no-owner".to_string()));
        assert!(spec.args.contains(&"--no-acl".to_string()));
        assert_eq!(spec.args.last().map(String::as_str), Some("app"));
    }

    #[test]
    fn quoting_doubles_embedded_quotes() {
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(quote_literal("it's"), "'it''s'");
    }
}
