//! Command-line arguments shared by the `tdsnmp-*` tools.

use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::error::Result;
use crate::session::SessionConfig;
use crate::v3::{AuthProtocol, PrivProtocol, SecurityLevel};

/// SNMP version on the command line.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum SnmpVersion {
    #[value(name = "1")]
    V1,
    #[default]
    #[value(name = "2c", alias = "2")]
    V2c,
    #[value(name = "3")]
    V3,
}

impl SnmpVersion {
    fn number(self) -> u8 {
        match self {
            SnmpVersion::V1 => 1,
            SnmpVersion::V2c => 2,
            SnmpVersion::V3 => 3,
        }
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// `name = TYPE: value` lines.
    #[default]
    Human,
    /// One JSON array.
    Json,
}

/// Target, version and community.
#[derive(Debug, Parser)]
pub struct CommonArgs {
    /// Agent host, `host:port`, or `tls://`/`dtls://`/`ssh://` address.
    #[arg(value_name = "TARGET")]
    pub target: String,

    /// SNMP version: 1, 2c or 3.
    #[arg(short = 'v', long = "snmp-version", default_value = "2c")]
    pub snmp_version: SnmpVersion,

    /// Community string (v1/v2c).
    #[arg(short = 'c', long = "community", default_value = "public")]
    pub community: String,

    /// Timeout per attempt in seconds.
    #[arg(short = 't', long = "timeout", default_value = "1")]
    pub timeout: f64,

    /// Retransmissions after the first attempt.
    #[arg(short = 'r', long = "retries", default_value = "3")]
    pub retries: u32,

    /// Fail when an object does not exist instead of printing it.
    #[arg(long = "abort-on-nonexistent")]
    pub abort_on_nonexistent: bool,
}

/// USM arguments.
#[derive(Debug, Parser)]
pub struct V3Args {
    /// Security name (implies -v 3).
    #[arg(short = 'u', long = "username")]
    pub username: Option<String>,

    /// Security level: noAuthNoPriv, authNoPriv or authPriv. Inferred from
    /// the protocols given when absent.
    #[arg(short = 'l', long = "level")]
    pub level: Option<SecurityLevel>,

    /// Authentication protocol: MD5 or SHA.
    #[arg(short = 'a', long = "auth-protocol")]
    pub auth_protocol: Option<AuthProtocol>,

    /// Authentication passphrase.
    #[arg(short = 'A', long = "auth-password")]
    pub auth_password: Option<String>,

    /// Privacy protocol: DES or AES.
    #[arg(short = 'x', long = "priv-protocol")]
    pub priv_protocol: Option<PrivProtocol>,

    /// Privacy passphrase.
    #[arg(short = 'X', long = "priv-password")]
    pub priv_password: Option<String>,

    /// Context name.
    #[arg(short = 'n', long = "context")]
    pub context: Option<String>,

    /// Authoritative engine id in hex; skips discovery.
    #[arg(short = 'e', long = "engine-id")]
    pub engine_id: Option<String>,
}

impl V3Args {
    pub fn is_v3(&self) -> bool {
        self.username.is_some()
    }

    fn level(&self) -> SecurityLevel {
        self.level.unwrap_or(match (&self.auth_password, &self.priv_password) {
            (Some(_), Some(_)) => SecurityLevel::AuthPriv,
            (Some(_), None) => SecurityLevel::AuthNoPriv,
            _ => SecurityLevel::NoAuthNoPriv,
        })
    }
}

/// Rendering and logging.
#[derive(Debug, Parser)]
pub struct OutputArgs {
    /// Output format.
    #[arg(short = 'O', long = "output", default_value = "human")]
    pub format: OutputFormat,

    /// Print numeric OIDs only.
    #[arg(long = "numeric")]
    pub numeric: bool,

    /// Print full label paths.
    #[arg(long = "long-names")]
    pub long_names: bool,

    /// Format values the way snmpget does.
    #[arg(long = "sprint")]
    pub sprint: bool,

    /// Print enumeration labels instead of numbers.
    #[arg(long = "enums")]
    pub enums: bool,

    /// Show request timing on stderr.
    #[arg(long = "timing")]
    pub timing: bool,

    /// Library debug logging; repeat for trace. `RUST_LOG` overrides.
    #[arg(short = 'd', long = "debug", action = clap::ArgAction::Count)]
    pub debug: u8,
}

impl OutputArgs {
    /// Install a stderr subscriber filtered by `-d` or `RUST_LOG`.
    pub fn init_tracing(&self) {
        use tracing_subscriber::EnvFilter;

        let default = match self.debug {
            0 => "tdsnmp=warn",
            1 => "tdsnmp=debug",
            _ => "tdsnmp=trace",
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }
}

/// Walk arguments.
#[derive(Debug, Parser)]
pub struct WalkArgs {
    /// Use GETNEXT instead of GETBULK.
    #[arg(long = "getnext")]
    pub getnext: bool,

    /// GETBULK max-repetitions.
    #[arg(long = "max-rep", default_value = "15")]
    pub max_repetitions: u32,
}

/// Build a session configuration from parsed arguments.
pub fn session_config(common: &CommonArgs, v3: &V3Args, output: &OutputArgs) -> Result<SessionConfig> {
    let version = if v3.is_v3() {
        3
    } else {
        common.snmp_version.number()
    };

    let mut builder = SessionConfig::builder(common.target.clone())
        .version(version)
        .community(&common.community)
        .timeout(Duration::from_secs_f64(common.timeout.max(0.0)))
        .retries(common.retries)
        .abort_on_nonexistent(common.abort_on_nonexistent)
        .use_numeric(output.numeric)
        .use_long_names(output.long_names)
        .use_sprint_value(output.sprint)
        .use_enums(output.enums);

    if let Some(username) = &v3.username {
        builder = builder.security_username(username).security_level(v3.level());
        if let Some(protocol) = v3.auth_protocol {
            builder = builder.auth_protocol(protocol);
        }
        if let Some(password) = &v3.auth_password {
            builder = builder.auth_password(password);
        }
        if let Some(protocol) = v3.priv_protocol {
            builder = builder.privacy_protocol(protocol);
        }
        if let Some(password) = &v3.priv_password {
            builder = builder.privacy_password(password);
        }
        if let Some(context) = &v3.context {
            builder = builder.context(context);
        }
        if let Some(engine_id) = &v3.engine_id {
            builder = builder.security_engine_id(engine_id);
        }
    }
    builder.build()
}
