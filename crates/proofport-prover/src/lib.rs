//! # Prover Invoker (C7)
//!
//! Prepares an isolated working directory, runs the external prover
//! binary, collects `(proof, publicInputs)`, and guarantees cleanup on
//! every exit path — including a timeout.

mod errors;

pub use errors::ProveError;

use async_trait::async_trait;
use proofport_types::ProveParams;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct ProveOutput {
    pub proof: String,
    pub public_inputs: Vec<String>,
}

#[async_trait]
pub trait ProverInvoker: Send + Sync {
    async fn prove(&self, params: &ProveParams) -> Result<ProveOutput, ProveError>;
}

/// Runs `<proverBinary> prove <workDir> <circuitId>` in a fresh temp
/// directory, symlinking the shared read-only circuit artifacts in.
pub struct ProcessProverInvoker {
    binary: PathBuf,
    circuits_dir: PathBuf,
    timeout: Duration,
}

impl ProcessProverInvoker {
    pub fn new(binary: impl Into<PathBuf>, circuits_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            circuits_dir: circuits_dir.into(),
            timeout,
        }
    }

    fn redacted_fingerprint(params: &ProveParams) -> String {
        let digest = proofport_crypto::sha256(params.signal_hash.as_bytes());
        hex::encode(digest)[..16].to_string()
    }

    fn circuit_artifacts_dir(&self, circuit_id: &str) -> PathBuf {
        self.circuits_dir.join(circuit_id)
    }

    fn write_input_file(dir: &Path, params: &ProveParams) -> Result<(), ProveError> {
        // Canonical key order matches what the compiled circuit expects.
        let mut toml = String::new();
        toml.push_str(&format!("circuit_id = \"{}\"\n", params.circuit_id));
        toml.push_str(&format!("address = \"{}\"\n", params.address.as_str()));
        toml.push_str(&format!("scope = \"{}\"\n", params.scope));
        toml.push_str(&format!("signal_hash = \"{}\"\n", params.signal_hash));
        toml.push_str(&format!("signature = \"{}\"\n", params.signature));
        if let Some(countries) = &params.country_list {
            let items: Vec<String> = countries.iter().map(|c| format!("\"{c}\"")).collect();
            toml.push_str(&format!("country_list = [{}]\n", items.join(", ")));
        }
        if let Some(is_included) = params.is_included {
            toml.push_str(&format!("is_included = {is_included}\n"));
        }
        std::fs::write(dir.join("Prover.toml"), toml)?;
        Ok(())
    }
}

#[async_trait]
impl ProverInvoker for ProcessProverInvoker {
    async fn prove(&self, params: &ProveParams) -> Result<ProveOutput, ProveError> {
        let work_dir = std::env::temp_dir().join(format!("proofport-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&work_dir)?;

        let cleanup = |dir: &Path| {
            let _ = std::fs::remove_dir_all(dir);
        };

        let artifacts_dir = self.circuit_artifacts_dir(&params.circuit_id);
        if !artifacts_dir.exists() {
            cleanup(&work_dir);
            return Err(ProveError::Config(format!(
                "missing circuit artifacts for {}",
                params.circuit_id
            )));
        }
        for entry_name in ["circuit.bin", "verification_key.bin"] {
            let target = artifacts_dir.join(entry_name);
            let link = work_dir.join(entry_name);
            if target.exists() {
                #[cfg(unix)]
                {
                    if let Err(err) = std::os::unix::fs::symlink(&target, &link) {
                        cleanup(&work_dir);
                        return Err(ProveError::Io(err));
                    }
                }
                #[cfg(not(unix))]
                {
                    if let Err(err) = std::fs::copy(&target, &link) {
                        cleanup(&work_dir);
                        return Err(ProveError::Io(err));
                    }
                }
            }
        }

        if let Err(err) = Self::write_input_file(&work_dir, params) {
            cleanup(&work_dir);
            return Err(err);
        }

        let result = self.run_binary(&work_dir, &params.circuit_id).await;
        let outcome = match result {
            Ok(raw) => raw,
            Err(err) => {
                cleanup(&work_dir);
                return Err(err);
            }
        };

        if outcome.0 {
            cleanup(&work_dir);
            return Err(ProveError::Failed {
                circuit_id: params.circuit_id.clone(),
                fingerprint: Self::redacted_fingerprint(params),
                stderr: outcome.1,
            });
        }

        let proof_path = work_dir.join("proof.out");
        let public_inputs_path = work_dir.join("public_inputs.out");
        let proof = std::fs::read(&proof_path);
        let public_inputs_raw = std::fs::read_to_string(&public_inputs_path);
        cleanup(&work_dir);

        let proof = proof.map_err(|_| {
            ProveError::Config(format!("missing proof artifact for {}", params.circuit_id))
        })?;
        let public_inputs_raw = public_inputs_raw.map_err(|_| {
            ProveError::Config(format!(
                "missing public inputs artifact for {}",
                params.circuit_id
            ))
        })?;

        Ok(ProveOutput {
            proof: proofport_crypto::to_hex0x(&proof),
            public_inputs: public_inputs_raw
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(|l| l.trim().to_string())
                .collect(),
        })
    }
}

impl ProcessProverInvoker {
    /// Runs the binary, bounded by `self.timeout`. Returns
    /// `(non_zero_exit, captured_stderr)` on a completed run.
    async fn run_binary(&self, work_dir: &Path, circuit_id: &str) -> Result<(bool, String), ProveError> {
        let mut child = Command::new(&self.binary)
            .arg("prove")
            .arg(work_dir)
            .arg(circuit_id)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let wait = async {
            let status = child.wait().await?;
            let mut stderr = String::new();
            if let Some(mut pipe) = child.stderr.take() {
                let _ = pipe.read_to_string(&mut stderr).await;
            }
            Ok::<_, std::io::Error>((status, stderr))
        };

        match tokio::time::timeout(self.timeout, wait).await {
            Ok(Ok((status, stderr))) => Ok((!status.success(), stderr)),
            Ok(Err(err)) => Err(ProveError::Io(err)),
            Err(_) => {
                let _ = child.start_kill();
                Err(ProveError::Timeout(self.timeout.as_secs()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proofport_types::Address;

    fn params() -> ProveParams {
        ProveParams {
            circuit_id: "missing_circuit".to_string(),
            address: Address::new("0xabc"),
            scope: "demo.test".to_string(),
            signal_hash: "0xsig".to_string(),
            signature: "0xsig".to_string(),
            country_list: None,
            is_included: None,
        }
    }

    #[tokio::test]
    async fn missing_artifacts_is_config_error() {
        let invoker = ProcessProverInvoker::new(
            "/bin/true",
            std::env::temp_dir().join("proofport-test-circuits-nonexistent"),
            Duration::from_secs(5),
        );
        let result = invoker.prove(&params()).await;
        assert!(matches!(result, Err(ProveError::Config(_))));
    }
}
