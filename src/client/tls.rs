//! TLS transport for the broker connection

use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rumqttc::Transport;
use rumqttc::tokio_rustls::rustls::client::danger::{
	HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use rumqttc::tokio_rustls::rustls::pki_types::{
	CertificateDer, ServerName, UnixTime,
};
use rumqttc::tokio_rustls::rustls::{
	self, ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme,
};
use tracing::warn;

use super::error::IngressError;

/// How the broker certificate is verified
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsMode {
	/// Verify against the platform's trusted roots
	#[default]
	NativeRoots,
	/// Verify against the PEM certificates in this file
	CaFile(PathBuf),
	/// Accept any certificate
	Insecure,
}

impl TlsMode {
	/// Builds the rumqttc transport for this mode.
	pub fn transport(&self) -> Result<Transport, IngressError> {
		match self {
			| Self::NativeRoots => Ok(Transport::tls_with_default_config()),
			| Self::CaFile(path) => {
				let config = ca_file_config(path)?;
				Ok(Transport::tls_with_config(config.into()))
			}
			| Self::Insecure => {
				warn!("Broker certificate verification is disabled");
				let config = ClientConfig::builder()
					.dangerous()
					.with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate))
					.with_no_client_auth();
				Ok(Transport::tls_with_config(config.into()))
			}
		}
	}
}

fn ca_file_config(path: &Path) -> Result<ClientConfig, IngressError> {
	let ca_cert = fs::read(path).map_err(|source| IngressError::CaFile {
		path: path.to_path_buf(),
		source,
	})?;
	let mut reader = BufReader::new(&ca_cert[..]);

	let mut root_cert_store = RootCertStore::empty();
	for cert in rustls_pemfile::certs(&mut reader) {
		let cert = cert.map_err(|source| IngressError::CaFile {
			path: path.to_path_buf(),
			source,
		})?;
		root_cert_store.add(cert)?;
	}
	if root_cert_store.is_empty() {
		return Err(IngressError::NoCertificates {
			path: path.to_path_buf(),
		});
	}

	Ok(ClientConfig::builder()
		.with_root_certificates(root_cert_store)
		.with_no_client_auth())
}

#[derive(Debug)]
struct AcceptAnyCertificate;

impl ServerCertVerifier for AcceptAnyCertificate {
	fn verify_server_cert(
		&self,
		_end_entity: &CertificateDer<'_>,
		_intermediates: &[CertificateDer<'_>],
		_server_name: &ServerName<'_>,
		_ocsp_response: &[u8],
		_now: UnixTime,
	) -> Result<ServerCertVerified, rustls::Error> {
		Ok(ServerCertVerified::assertion())
	}

	fn verify_tls12_signature(
		&self,
		_message: &[u8],
		_cert: &CertificateDer<'_>,
		_dss: &DigitallySignedStruct,
	) -> Result<HandshakeSignatureValid, rustls::Error> {
		Ok(HandshakeSignatureValid::assertion())
	}

	fn verify_tls13_signature(
		&self,
		_message: &[u8],
		_cert: &CertificateDer<'_>,
		_dss: &DigitallySignedStruct,
	) -> Result<HandshakeSignatureValid, rustls::Error> {
		Ok(HandshakeSignatureValid::assertion())
	}

	fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
		vec![
			SignatureScheme::ECDSA_NISTP256_SHA256,
			SignatureScheme::ECDSA_NISTP384_SHA384,
			SignatureScheme::ED25519,
			SignatureScheme::RSA_PSS_SHA256,
			SignatureScheme::RSA_PSS_SHA384,
			SignatureScheme::RSA_PSS_SHA512,
			SignatureScheme::RSA_PKCS1_SHA256,
			SignatureScheme::RSA_PKCS1_SHA384,
			SignatureScheme::RSA_PKCS1_SHA512,
		]
	}
}
