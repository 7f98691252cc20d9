//! AWS IoT plugin - provision a thing while the part builds
//!
//! The build step drives the AWS CLI (`aws iot ...`) and, for locally
//! generated keys, `openssl`. Every step must succeed for the next one to run:
//!
//! 1. create `<build>/certs`
//! 2. obtain a certificate, either from AWS-generated keys or from a local
//!    key pair and CSR
//! 3. download the root CA into `certs/rootCA.pem`
//! 4. write the supplied policy document to `<build>/policydocument`
//! 5. create the policy, or look it up when it already exists
//! 6. attach the policy to the certificate
//! 7. create the thing
//!
//! Everything written along the way stays in the build directory. Keys,
//! certificates and AWS responses never reach the install tree, and the
//! plugin packages nothing.

use super::{
    DependencyManifest, ParamExt, Plugin, PluginContext, PluginError, PluginFactory,
    PluginOptions, PluginOutput, PluginResult,
};
use crate::runner::{CommandOutput, Invocation};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Policy name used when none is configured
pub const DEFAULT_POLICY_NAME: &str = "PubSubToAnyTopic";

const CERTS_DIR: &str = "certs";
const POLICY_DOCUMENT_FILE: &str = "policydocument";
const CERT_RESPONSE_FILE: &str = "certresponse.txt";
const ARN_RESPONSE_FILE: &str = "arnresponse.txt";

/// Validated options of an `awsiot` part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsIotOptions {
    /// Let AWS generate the key pair instead of creating one locally
    pub generate_keys: bool,
    /// Policy document contents; `None` when left empty
    pub policy_document: Option<String>,
    pub policy_name: String,
    /// Name of the thing to create
    pub thing: String,
    /// AWS IoT endpoint override
    pub endpoint: Option<String>,
}

impl AwsIotOptions {
    pub fn from_options(options: &PluginOptions) -> PluginResult<Self> {
        let thing = options.get_string_required("thing")?;
        if thing.trim().is_empty() {
            return Err(PluginError::InvalidParameter(
                "thing cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            generate_keys: options.get_bool("generatekeys")?.unwrap_or(true),
            policy_document: options
                .get_string("policydocument")?
                .filter(|doc| !doc.is_empty()),
            policy_name: options
                .get_string("policyname")?
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| DEFAULT_POLICY_NAME.to_string()),
            thing,
            endpoint: options.get_string("endpoint")?.filter(|e| !e.is_empty()),
        })
    }
}

/// Factory for the `awsiot` plugin
pub struct AwsIotFactory;

impl PluginFactory for AwsIotFactory {
    fn name(&self) -> &'static str {
        "awsiot"
    }

    fn description(&self) -> &'static str {
        "Provision an AWS IoT thing with certificate and policy"
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "$schema": "http://json-schema.org/draft-04/schema#",
            "type": "object",
            "properties": {
                "generatekeys": {"type": "boolean", "default": true},
                "policydocument": {"type": "string", "default": ""},
                "policyname": {"type": "string", "default": DEFAULT_POLICY_NAME},
                "thing": {"type": "string"},
                "endpoint": {"type": "string"}
            },
            "required": ["thing"]
        })
    }

    fn create(&self, part_name: &str, options: &PluginOptions) -> PluginResult<Box<dyn Plugin>> {
        Ok(Box::new(AwsIotPlugin::new(
            part_name,
            AwsIotOptions::from_options(options)?,
        )))
    }
}

/// `create-keys-and-certificate` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeysAndCertificate {
    certificate_arn: String,
    certificate_pem: String,
    key_pair: KeyPair,
}

#[derive(Debug, Deserialize)]
struct KeyPair {
    #[serde(rename = "PublicKey")]
    public_key: String,
    #[serde(rename = "PrivateKey")]
    private_key: String,
}

/// `create-certificate-from-csr` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CertificateFromCsr {
    #[serde(alias = "arn")]
    certificate_arn: String,
    certificate_id: Option<String>,
}

impl CertificateFromCsr {
    fn id(&self) -> PluginResult<&str> {
        if let Some(ref id) = self.certificate_id {
            return Ok(id);
        }
        self.certificate_arn
            .split_once(":cert/")
            .map(|(_, id)| id)
            .ok_or_else(|| {
                PluginError::ParseError(format!(
                    "certificate ARN '{}' has no certificate id",
                    self.certificate_arn
                ))
            })
    }
}

/// `create-policy` / `get-policy` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PolicyResponse {
    policy_arn: String,
}

/// Certificate obtained in the acquisition step
struct Certificate {
    arn: String,
    files: Vec<PathBuf>,
}

/// The `awsiot` plugin bound to one part
#[derive(Debug, Clone)]
pub struct AwsIotPlugin {
    part_name: String,
    options: AwsIotOptions,
}

impl AwsIotPlugin {
    pub fn new(part_name: impl Into<String>, options: AwsIotOptions) -> Self {
        Self {
            part_name: part_name.into(),
            options,
        }
    }

    pub fn options(&self) -> &AwsIotOptions {
        &self.options
    }

    /// Base `aws [--endpoint-url URL] iot <subcommand>` invocation.
    fn aws(&self, context: &PluginContext, subcommand: &str) -> PluginResult<Invocation> {
        let invocation = Invocation::from_argv(aws_command(context)?)
            .ok_or_else(|| PluginError::InvalidParameter("aws.cli is empty".to_string()))?;

        let invocation = match self.options.endpoint {
            Some(ref endpoint) => invocation.args(["--endpoint-url", endpoint.as_str()]),
            None => invocation,
        };

        Ok(invocation
            .args(["iot", subcommand])
            .current_dir(&context.build_dir))
    }

    /// Run a command and fail on a non-zero exit.
    fn run(&self, context: &PluginContext, invocation: &Invocation) -> PluginResult<CommandOutput> {
        let output = context
            .runner
            .run(invocation)
            .map_err(|source| PluginError::Spawn {
                command: invocation.to_string(),
                source,
            })?;

        if output.is_success() {
            Ok(output)
        } else {
            Err(PluginError::CommandFailed {
                command: invocation.to_string(),
                code: output.code.unwrap_or(-1),
                message: output.message().to_string(),
            })
        }
    }

    /// Run a command and save its stdout to `path`.
    fn run_to_file(
        &self,
        context: &PluginContext,
        invocation: &Invocation,
        path: &Path,
    ) -> PluginResult<String> {
        let output = self.run(context, invocation)?;
        fs::write(path, &output.stdout)?;
        debug!(path = %path.display(), "saved command output");
        Ok(output.stdout)
    }

    fn acquire_generated_keys(
        &self,
        context: &PluginContext,
        certs_dir: &Path,
    ) -> PluginResult<Certificate> {
        let response_path = certs_dir.join("certs.json");
        let invocation = self
            .aws(context, "create-keys-and-certificate")?
            .arg("--set-as-active");
        let response = self.run_to_file(context, &invocation, &response_path)?;

        let keys: KeysAndCertificate = serde_json::from_str(&response).map_err(|e| {
            PluginError::ParseError(format!("create-keys-and-certificate response: {}", e))
        })?;

        let files = vec![
            certs_dir.join("cert.pem"),
            certs_dir.join("privateKey.pem"),
            certs_dir.join("publicKey.pem"),
        ];
        fs::write(&files[0], &keys.certificate_pem)?;
        fs::write(&files[1], &keys.key_pair.private_key)?;
        fs::write(&files[2], &keys.key_pair.public_key)?;

        info!(certificate = %keys.certificate_arn, "created keys and certificate");
        Ok(Certificate {
            arn: keys.certificate_arn,
            files: std::iter::once(response_path).chain(files).collect(),
        })
    }

    fn acquire_from_csr(
        &self,
        context: &PluginContext,
        certs_dir: &Path,
    ) -> PluginResult<Certificate> {
        let key_path = certs_dir.join("privateKey.pem");
        let csr_path = certs_dir.join("cert.csr");
        let cert_path = certs_dir.join("cert.pem");
        let response_path = context.build_dir.join(CERT_RESPONSE_FILE);

        let genrsa = Invocation::new("openssl")
            .args(["genrsa", "-out"])
            .arg(path_arg(&key_path))
            .arg("2048")
            .current_dir(&context.build_dir);
        self.run(context, &genrsa)?;

        let req = Invocation::new("openssl")
            .args(["req", "-new", "-key"])
            .arg(path_arg(&key_path))
            .arg("-out")
            .arg(path_arg(&csr_path))
            .arg("-subj")
            .arg(format!("/CN={}", self.options.thing))
            .current_dir(&context.build_dir);
        self.run(context, &req)?;
        info!(csr = %csr_path.display(), "generated local key pair and CSR");

        let create = self
            .aws(context, "create-certificate-from-csr")?
            .arg("--certificate-signing-request")
            .arg(format!("file://{}", path_arg(&csr_path)))
            .arg("--set-as-active");
        let response = self.run_to_file(context, &create, &response_path)?;

        let certificate: CertificateFromCsr = serde_json::from_str(&response).map_err(|e| {
            PluginError::ParseError(format!("create-certificate-from-csr response: {}", e))
        })?;

        let describe = self
            .aws(context, "describe-certificate")?
            .args(["--certificate-id", certificate.id()?])
            .args(["--output", "text"])
            .args(["--query", "certificateDescription.certificatePem"]);
        self.run_to_file(context, &describe, &cert_path)?;

        info!(certificate = %certificate.certificate_arn, "created certificate from CSR");
        Ok(Certificate {
            arn: certificate.certificate_arn,
            files: vec![key_path, csr_path, response_path, cert_path],
        })
    }

    fn fetch_root_ca(&self, context: &PluginContext, certs_dir: &Path) -> PluginResult<PathBuf> {
        let url = context.aws.root_ca_url.as_str();
        let body = context.fetcher.fetch(url)?;

        if let Some(ref expected) = context.aws.root_ca_sha256 {
            let actual = format!("{:x}", Sha256::digest(&body));
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(PluginError::ChecksumMismatch {
                    url: url.to_string(),
                    expected: expected.to_ascii_lowercase(),
                    actual,
                });
            }
        }

        let path = certs_dir.join("rootCA.pem");
        fs::write(&path, &body)?;
        info!(url, "downloaded root CA");
        Ok(path)
    }

    /// Write the supplied policy document and return the path the
    /// create-policy call refers to.
    fn resolve_policy_document(&self, context: &PluginContext) -> PluginResult<PathBuf> {
        let path = context.build_dir.join(POLICY_DOCUMENT_FILE);
        match self.options.policy_document {
            Some(ref document) => fs::write(&path, document)?,
            None if !path.exists() => warn!(
                path = %path.display(),
                "no policydocument option set and no policy document on disk; create-policy will reference a missing file"
            ),
            None => {}
        }
        Ok(path)
    }

    fn create_or_get_policy(
        &self,
        context: &PluginContext,
        document: &Path,
    ) -> PluginResult<PolicyResponse> {
        let response_path = context.build_dir.join(ARN_RESPONSE_FILE);
        let create = self
            .aws(context, "create-policy")?
            .args(["--policy-name", self.options.policy_name.as_str()])
            .arg("--policy-document")
            .arg(format!("file://{}", path_arg(document)));

        let response = match self.run_to_file(context, &create, &response_path) {
            Ok(response) => response,
            Err(PluginError::CommandFailed { message, .. }) => {
                warn!(
                    policy = %self.options.policy_name,
                    error = %message,
                    "creating the policy failed, which is expected if it already exists; looking it up instead"
                );
                let get = self
                    .aws(context, "get-policy")?
                    .args(["--policy-name", self.options.policy_name.as_str()]);
                self.run_to_file(context, &get, &response_path)?
            }
            Err(e) => return Err(e),
        };

        serde_json::from_str(&response)
            .map_err(|e| PluginError::ParseError(format!("policy response: {}", e)))
    }
}

impl Plugin for AwsIotPlugin {
    fn kind(&self) -> &'static str {
        "awsiot"
    }

    fn dependencies(&self) -> DependencyManifest {
        let mut manifest = DependencyManifest::default();
        if !self.options.generate_keys {
            manifest.build_packages.push("openssl".to_string());
        }
        manifest
    }

    fn build(&self, context: &PluginContext) -> PluginResult<PluginOutput> {
        let certs_dir = context.build_dir.join(CERTS_DIR);
        fs::create_dir_all(&certs_dir)?;

        let certificate = if self.options.generate_keys {
            self.acquire_generated_keys(context, &certs_dir)?
        } else {
            self.acquire_from_csr(context, &certs_dir)?
        };

        let root_ca = self.fetch_root_ca(context, &certs_dir)?;

        let document = self.resolve_policy_document(context)?;
        let policy = self.create_or_get_policy(context, &document)?;

        let attach = self
            .aws(context, "attach-principal-policy")?
            .args(["--principal", certificate.arn.as_str()])
            .args(["--policy-name", self.options.policy_name.as_str()]);
        self.run(context, &attach)?;
        info!(
            policy = %self.options.policy_name,
            certificate = %certificate.arn,
            "attached policy"
        );

        let create_thing = self
            .aws(context, "create-thing")?
            .args(["--thing-name", self.options.thing.as_str()]);
        self.run(context, &create_thing)?;
        info!(part = %self.part_name, "Created Thing: {}", self.options.thing);

        let mut output = PluginOutput::new(format!("Created Thing: {}", self.options.thing))
            .with_data("thing", serde_json::json!(self.options.thing))
            .with_data("certificateArn", serde_json::json!(certificate.arn))
            .with_data("policyArn", serde_json::json!(policy.policy_arn));
        for file in certificate.files {
            output = output.with_artifact(file);
        }
        Ok(output.with_artifact(root_ca))
    }

    fn staged_files(&self) -> Vec<String> {
        vec![
            "*".to_string(),
            format!("-{}", CERT_RESPONSE_FILE),
            format!("-{}", ARN_RESPONSE_FILE),
        ]
    }

    fn packaged_files(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Resolve the AWS CLI command line.
///
/// Uses `aws.cli` when configured, then an AWS CLI staged by another part,
/// then `aws` from `PATH`.
fn aws_command(context: &PluginContext) -> PluginResult<Vec<String>> {
    if let Some(ref cli) = context.aws.cli {
        return shell_words::split(cli)
            .map_err(|e| PluginError::InvalidParameter(format!("aws.cli: {}", e)));
    }

    let staged = context.stage_dir.join("usr").join("bin").join("aws");
    if staged.exists() {
        return Ok(vec!["python3".to_string(), path_arg(&staged)]);
    }

    let aws = which::which("aws")
        .map(|p| path_arg(&p))
        .unwrap_or_else(|_| "aws".to_string());
    Ok(vec![aws])
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
