//! Command-line client for a Sky server.
//!
//! Sky servers usually present self-signed certificates, so the client does
//! not verify the server certificate chain.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::crypto::{self, CryptoProvider};
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use tokio_rustls::TlsConnector;

use sky_server::config::DEFAULT_PORT;

#[derive(Parser)]
#[command(name = "sky-cli")]
#[command(about = "Fetch resources from, or upload to, a Sky server", long_about = None)]
struct Cli {
    #[arg(long, default_value = "localhost")]
    host: String,

    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Connect without TLS.
    #[arg(long)]
    plain: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a resource and print the raw response
    Get {
        /// Path (`docs/guide`) or full locator (`sky://host/docs/guide`)
        locator: String,
    },
    /// Upload a file with a Drift request
    Drift {
        file: PathBuf,

        #[arg(long, conflicts_with = "token_file", required_unless_present = "token_file")]
        token: Option<String>,

        /// Read the token from a file, e.g. the server's drift_token.txt
        #[arg(long)]
        token_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let request = match &cli.command {
        Commands::Get { locator } => {
            let line = if locator.contains("://") {
                locator.clone()
            } else {
                format!("sky://{}/{}", cli.host, locator.trim_start_matches('/'))
            };
            format!("{line}\r\n").into_bytes()
        }
        Commands::Drift {
            file,
            token,
            token_file,
        } => {
            let token = match (token, token_file) {
                (Some(token), _) => token.clone(),
                (None, Some(path)) => std::fs::read_to_string(path)?.trim().to_string(),
                (None, None) => return Err("either --token or --token-file is required".into()),
            };
            let payload = std::fs::read(file)?;
            let mut request = format!("DRIFT size={};token={}\r\n", payload.len(), token).into_bytes();
            request.extend_from_slice(&payload);
            request
        }
    };

    let tcp = TcpStream::connect((cli.host.as_str(), cli.port)).await?;
    let response = if cli.plain {
        exchange(tcp, &request).await?
    } else {
        let connector = TlsConnector::from(Arc::new(client_config()?));
        let server_name = ServerName::try_from(cli.host.clone())?;
        let tls = connector.connect(server_name, tcp).await?;
        exchange(tls, &request).await?
    };

    print_response(&response);
    Ok(())
}

async fn exchange<S>(mut stream: S, request: &[u8]) -> std::io::Result<Vec<u8>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(request).await?;
    stream.flush().await?;

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await?;
    Ok(response)
}

fn print_response(response: &[u8]) {
    let text = String::from_utf8_lossy(response);
    match text.split_once("\r\n") {
        Some((header, rest)) => {
            eprintln!("{header}");
            print!("{rest}");
        }
        None => eprintln!("{text}"),
    }
}

fn client_config() -> Result<ClientConfig, tokio_rustls::rustls::Error> {
    let provider = Arc::new(crypto::aws_lc_rs::default_provider());
    let config = ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate(provider)))
        .with_no_client_auth();
    Ok(config)
}

/// Accepts any server certificate but still checks handshake signatures.
#[derive(Debug)]
struct AcceptAnyCertificate(Arc<CryptoProvider>);

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, tokio_rustls::rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        crypto::verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        crypto::verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
