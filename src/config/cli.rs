//! Command line interface.

use std::path::PathBuf;

use clap::Parser;

use crate::config::schema::{ServerConfig, TlsConfig};

#[derive(Debug, Default, Parser)]
#[command(name = "mapserve", version)]
#[command(about = "Serve files, directories, archives, uploads and proxies under URL endpoints")]
#[command(after_help = "MAPPINGS have the form [endpoint:]source, for example:\n  \
    /:.                      current directory at /\n  \
    /notes.txt:~/notes.txt   a single file\n  \
    @/up:incoming            upload form storing into ./incoming\n  \
    /hi:@hello               literal text\n  \
    30x/old:/new             permanent redirect\n  \
    /api/:http://localhost:3000/\n  \
    /src.tgz:tar+gz://./src?level=9\n  \
    /site/:zipfs://site.zip?index=index.html\n  \
    /me:myip://?fuzzy&info=ripe")]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address to bind to (":port" means all interfaces) [default: :8080]
    #[arg(short, long, value_name = "ADDR")]
    pub bind: Option<String>,

    /// Do not log requests
    #[arg(long)]
    pub no_log: bool,

    /// Do not handle Accept-Encoding
    #[arg(long)]
    pub no_compress: bool,

    /// Require HTTP basic auth
    #[arg(long, value_name = "USER:PASS")]
    pub auth: Option<String>,

    /// Value of the Server header
    #[arg(long, value_name = "ID")]
    pub server_id: Option<String>,

    /// Dump request bodies to stdout
    #[arg(long)]
    pub tee_body: bool,

    /// Serve an index page listing all endpoints at "/"
    #[arg(long)]
    pub serve_index: bool,

    /// Print a QR code pointing at the bind address on startup
    #[arg(long)]
    pub show_qr: bool,

    /// PEM certificate
    #[arg(long, value_name = "FILE", requires = "tls_key")]
    pub tls_cert: Option<PathBuf>,

    /// PEM private key
    #[arg(long, value_name = "FILE", requires = "tls_cert")]
    pub tls_key: Option<PathBuf>,

    /// Diagnostic log level [default: info]
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Maximum accepted upload size in bytes
    #[arg(long, value_name = "BYTES")]
    pub upload_limit: Option<u64>,

    /// Mappings in [endpoint:]source form
    #[arg(value_name = "MAPPINGS")]
    pub mappings: Vec<String>,
}

impl Cli {
    /// Overlay command line values onto `config`. Mappings are appended.
    pub fn apply(&self, config: &mut ServerConfig) {
        config.mappings.extend(self.mappings.iter().cloned());

        if let Some(bind) = &self.bind {
            config.listener.bind_address = bind.clone();
        }
        if let (Some(cert), Some(key)) = (&self.tls_cert, &self.tls_key) {
            config.listener.tls = Some(TlsConfig {
                cert_path: cert.clone(),
                key_path: key.clone(),
            });
        }
        if self.no_log {
            config.pipeline.log_requests = false;
        }
        if self.no_compress {
            config.pipeline.compress = false;
        }
        if self.tee_body {
            config.pipeline.tee_body = true;
        }
        if let Some(auth) = &self.auth {
            config.pipeline.auth = Some(auth.clone());
        }
        if let Some(id) = &self.server_id {
            config.pipeline.server_id = id.clone();
        }
        if self.serve_index {
            config.serve_index = true;
        }
        if self.show_qr {
            config.show_qr = true;
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
        if let Some(limit) = self.upload_limit {
            config.uploads.max_size = limit;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags_and_mappings() {
        let cli = Cli::try_parse_from([
            "mapserve",
            "-b",
            ":9000",
            "--no-log",
            "--auth",
            "a:b",
            "/:.",
            "@/up:incoming",
        ])
        .unwrap();
        assert_eq!(cli.bind.as_deref(), Some(":9000"));
        assert!(cli.no_log);
        assert_eq!(cli.mappings, vec!["/:.", "@/up:incoming"]);
    }

    #[test]
    fn test_tls_flags_require_each_other() {
        assert!(Cli::try_parse_from(["mapserve", "--tls-cert", "c.pem"]).is_err());
        assert!(Cli::try_parse_from(["mapserve", "--tls-cert", "c.pem", "--tls-key", "k.pem"]).is_ok());
    }

    #[test]
    fn test_apply_overrides_file_values() {
        let mut config = ServerConfig {
            mappings: vec!["/a:.".to_string()],
            ..ServerConfig::default()
        };
        let cli = Cli {
            bind: Some("127.0.0.1:1".to_string()),
            no_compress: true,
            upload_limit: Some(7),
            mappings: vec!["/b:.".to_string()],
            ..Cli::default()
        };
        cli.apply(&mut config);
        assert_eq!(config.mappings, vec!["/a:.", "/b:."]);
        assert_eq!(config.listener.bind_address, "127.0.0.1:1");
        assert!(!config.pipeline.compress);
        assert!(config.pipeline.log_requests);
        assert_eq!(config.uploads.max_size, 7);
    }
}
