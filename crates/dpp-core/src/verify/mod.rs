//! Packet verification pipeline.
//!
//! One pass per packet. A pass owns its inputs and its enriched schema
//! copies; the only shared collaborators are the schema engine (scoped
//! registrations) and the data provider (read-only lookups).
//!
//! Contract packets:
//! 1. contract structure (meta-schema and index rules)
//! 2. `contractId` equals the contract's derived id
//! 3. contract not already present
//!
//! Document packets:
//! 1. document count limit and fingerprint duplicates
//! 2. governing contract fetched once; when absent, contract-dependent
//!    checks are skipped
//! 3. structure of every document
//! 4. scope binding of every document
//! 5. unique indices (in packet, then persisted) and lifecycle, the
//!    persisted lookups running concurrently
//!
//! Every stage runs; findings are merged into one report. Only fatal
//! errors ([`DppError`]) stop a pass.

pub mod lifecycle;

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info_span, warn, Instrument};

use crate::config::{validate_config, CoreConfig};
use crate::duplicates;
use crate::errors::{DppError, DppResult};
use crate::findings::{Finding, ValidationResult};
use crate::integrity::{self, PacketCommitment};
use crate::model::contract::Contract;
use crate::model::document::Document;
use crate::model::packet::{
    Packet, PROPERTY_CONTRACTS, PROPERTY_CONTRACT_ID, PROPERTY_DOCUMENTS,
    PROPERTY_ITEMS_HASH, PROPERTY_ITEMS_MERKLE_ROOT,
};
use crate::provider::DataProvider;
use crate::schema::{ContractValidator, DocumentValidator, SchemaEngine};

pub use lifecycle::{check_lifecycle, check_scope};

/// Outcome of one verification pass.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyReport {
    pub ok: bool,
    pub findings: Vec<Finding>,
    pub items_hash: Option<String>,
    pub items_merkle_root: Option<String>,
}

impl VerifyReport {
    pub fn has_errors(&self) -> bool {
        !self.findings.is_empty()
    }

    pub fn codes(&self) -> Vec<&'static str> {
        self.findings.iter().map(Finding::code).collect()
    }
}

/// Declared commitment carried by a wire packet.
#[derive(Debug, Clone, Default)]
struct Declared {
    items_hash: Option<String>,
    items_merkle_root: Option<String>,
}

#[derive(Default)]
pub struct PacketVerifierBuilder {
    engine: Option<Arc<dyn SchemaEngine>>,
    provider: Option<Arc<dyn DataProvider>>,
    config: CoreConfig,
}

impl PacketVerifierBuilder {
    pub fn schema_engine(mut self, engine: Arc<dyn SchemaEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn data_provider(mut self, provider: Arc<dyn DataProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn config(mut self, config: CoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> DppResult<PacketVerifier> {
        let engine = self
            .engine
            .ok_or(DppError::MissingCollaborator("schema engine"))?;
        let provider = self
            .provider
            .ok_or(DppError::MissingCollaborator("data provider"))?;
        validate_config(&self.config)?;

        Ok(PacketVerifier {
            contracts: ContractValidator::new(engine.clone(), self.config.clone()),
            documents: DocumentValidator::new(engine),
            provider,
            config: self.config,
        })
    }
}

#[derive(Clone)]
pub struct PacketVerifier {
    contracts: ContractValidator,
    documents: DocumentValidator,
    provider: Arc<dyn DataProvider>,
    config: CoreConfig,
}

impl fmt::Debug for PacketVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacketVerifier")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PacketVerifier {
    pub fn builder() -> PacketVerifierBuilder {
        PacketVerifierBuilder::default()
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Verify a typed packet submitted by `user_id`.
    pub async fn verify(&self, packet: &Packet, user_id: &str) -> DppResult<VerifyReport> {
        let contracts = packet
            .contract()
            .map(Contract::to_json)
            .transpose()?
            .into_iter()
            .collect::<Vec<_>>();
        let documents: Vec<Value> = packet.documents().iter().map(Document::to_json).collect();
        self.run(packet.contract_id(), &contracts, &documents, user_id, None)
            .await
    }

    /// Verify a packet in its keyed wire form, including its declared
    /// `itemsHash` and `itemsMerkleRoot`.
    pub async fn verify_raw(&self, raw: &Value, user_id: &str) -> DppResult<VerifyReport> {
        let obj = raw
            .as_object()
            .ok_or_else(|| DppError::invalid_argument("packet must be an object"))?;

        let contract_id = obj
            .get(PROPERTY_CONTRACT_ID)
            .and_then(Value::as_str)
            .ok_or_else(|| DppError::invalid_argument("packet contractId must be a string"))?;
        let contracts = array_field(obj, PROPERTY_CONTRACTS)?;
        let documents = array_field(obj, PROPERTY_DOCUMENTS)?;

        if contracts.len() > 1 {
            return Err(DppError::invalid_argument(format!(
                "packet may carry at most one contract, got {}",
                contracts.len()
            )));
        }
        if !contracts.is_empty() && !documents.is_empty() {
            return Err(DppError::ContractAndDocumentsNotAllowed);
        }

        let declared = Declared {
            items_hash: optional_string(obj, PROPERTY_ITEMS_HASH)?,
            items_merkle_root: optional_string(obj, PROPERTY_ITEMS_MERKLE_ROOT)?,
        };

        self.run(contract_id, contracts, documents, user_id, Some(declared))
            .await
    }

    /// Verify a canonically encoded packet.
    pub async fn verify_bytes(&self, bytes: &[u8], user_id: &str) -> DppResult<VerifyReport> {
        let raw = crate::canonical::decode(bytes)?;
        self.verify_raw(&raw, user_id).await
    }

    async fn run(
        &self,
        contract_id: &str,
        contracts: &[Value],
        documents: &[Value],
        user_id: &str,
        declared: Option<Declared>,
    ) -> DppResult<VerifyReport> {
        let span = info_span!(
            "verify_packet",
            contract_id = %contract_id,
            contracts = contracts.len(),
            documents = documents.len()
        );

        async move {
            let max_bytes = self.config.limits.max_encoded_bytes;
            let hashes = integrity::items_hashes_with_limit(contracts, documents, max_bytes)?;
            let commitment = PacketCommitment::from_hashes(&hashes)?;

            let mut result = ValidationResult::new();

            if let Some(declared) = declared {
                if declared.items_hash != commitment.items_hash {
                    result.push(Finding::InvalidItemsHash {
                        declared: declared.items_hash,
                        computed: commitment.items_hash.clone(),
                    });
                }
                if declared.items_merkle_root != commitment.items_merkle_root {
                    result.push(Finding::InvalidItemsMerkleRoot {
                        declared: declared.items_merkle_root,
                        computed: commitment.items_merkle_root.clone(),
                    });
                }
            }

            if let Some(raw_contract) = contracts.first() {
                result.merge(self.verify_contract(contract_id, raw_contract).await?);
            } else if !documents.is_empty() {
                result.merge(self.verify_documents(contract_id, documents, user_id).await?);
            } else {
                result.push(Finding::EmptyPacket);
            }

            let findings = result.into_findings();
            let ok = findings.is_empty();
            if ok {
                debug!("packet accepted");
            } else {
                let codes: Vec<&str> = findings.iter().map(Finding::code).collect();
                warn!(findings = findings.len(), ?codes, "packet rejected");
            }

            Ok(VerifyReport {
                ok,
                findings,
                items_hash: commitment.items_hash,
                items_merkle_root: commitment.items_merkle_root,
            })
        }
        .instrument(span)
        .await
    }

    async fn verify_contract(&self, contract_id: &str, raw: &Value) -> DppResult<ValidationResult> {
        let mut result = self.contracts.validate_raw(raw)?;
        debug!(stage = "contract_structure", findings = result.findings().len());

        // The contract id is the hash of its canonical form.
        let computed =
            crate::hash::hash_canonical_limited_hex(raw, self.config.limits.max_encoded_bytes)?;
        if computed != contract_id {
            result.push(Finding::InvalidContractId {
                declared: contract_id.to_string(),
                computed: computed.clone(),
            });
        }

        if self.provider.fetch_contract(&computed).await?.is_some() {
            result.push(Finding::ContractAlreadyPresent {
                contract_id: computed,
            });
        }

        Ok(result)
    }

    async fn verify_documents(
        &self,
        contract_id: &str,
        raw_documents: &[Value],
        user_id: &str,
    ) -> DppResult<ValidationResult> {
        let mut result = ValidationResult::new();

        let max = self.config.limits.max_documents_per_packet;
        if raw_documents.len() > max {
            result.push(Finding::TooManyDocuments {
                count: raw_documents.len(),
                max,
            });
        }

        result.merge(duplicates::find_duplicate_fingerprints(raw_documents));
        debug!(stage = "fingerprints", findings = result.findings().len());

        let contract = self.provider.fetch_contract(contract_id).await?;
        if contract.is_none() {
            result.push(Finding::ContractNotPresent {
                contract_id: contract_id.to_string(),
            });
        }

        // Structure, then decode whatever carries usable system fields.
        let mut decoded = Vec::with_capacity(raw_documents.len());
        for raw in raw_documents {
            let structure = match &contract {
                Some(contract) => self.documents.validate_raw(raw, contract)?,
                None => self.documents.validate_system_fields(raw)?,
            };
            match Document::from_json(raw, user_id) {
                Ok(document) => decoded.push(document),
                Err(e @ DppError::UnknownAction(_)) => return Err(e),
                Err(e) if structure.is_valid() => result.push(Finding::UndecodableDocument {
                    document: raw.clone(),
                    reason: e.to_string(),
                }),
                Err(_) => {}
            }
            result.merge(structure);
        }
        debug!(stage = "structure", decoded = decoded.len(), findings = result.findings().len());

        result.merge(check_scope(contract_id, user_id, &decoded));

        let Some(contract) = contract else {
            result.merge(check_lifecycle(self.provider.as_ref(), contract_id, &decoded).await?);
            return Ok(result);
        };

        let defined: Vec<Document> = decoded
            .into_iter()
            .filter(|d| contract.is_document_defined(d.doc_type()))
            .collect();

        result.merge(duplicates::find_in_packet(&contract, &defined));

        let (persisted, lifecycle) = futures::try_join!(
            duplicates::find_persisted(self.provider.as_ref(), contract_id, &contract, &defined),
            check_lifecycle(self.provider.as_ref(), contract_id, &defined),
        )?;
        result.merge(persisted);
        result.merge(lifecycle);
        debug!(stage = "state", findings = result.findings().len());

        Ok(result)
    }
}

fn array_field<'a>(obj: &'a Map<String, Value>, key: &str) -> DppResult<&'a [Value]> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(_) => Err(DppError::invalid_argument(format!(
            "packet {key} must be an array"
        ))),
    }
}

fn optional_string(obj: &Map<String, Value>, key: &str) -> DppResult<Option<String>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(DppError::invalid_argument(format!(
            "packet {key} must be a string or null"
        ))),
    }
}
