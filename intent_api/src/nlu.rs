// src/nlu.rs

use super::config::NluConfig;
use super::error::NluError;
use super::model::{IntentHead, JointBert};
use super::tokenize::{Encoder, IntentVocab, pad_batch};
use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::Config as BertConfig;
use hf_hub::api::sync::Api;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScoredIntent {
    /// Full vocabulary label, e.g. `Inform+景点+名称`.
    pub label: String,
    /// First `+` segment of the label.
    pub intent: String,
    pub logit: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub intent: String,
    pub score: f32,
    pub intents: Vec<ScoredIntent>,
}

/// Anything that can classify an utterance. One instance serves every worker.
pub trait IntentNlu: Send + Sync {
    fn predict(&self, utterance: &str, context: &[String]) -> Result<Prediction, NluError>;

    fn intent_count(&self) -> usize;
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Turns multi-label logits into a ranked prediction.
///
/// Every positive logit is a predicted intent. When none is positive the
/// argmax label is returned alone, so there is always a top intent.
pub fn recover_intents(vocab: &IntentVocab, logits: &[f32]) -> Result<Prediction, NluError> {
    if logits.len() != vocab.len() || logits.is_empty() {
        return Err(NluError::LogitMismatch {
            expected: vocab.len(),
            got: logits.len(),
        });
    }

    let mut ranked: Vec<(usize, f32)> = logits.iter().copied().enumerate().collect();
    ranked.sort_by(|(_, a), (_, b)| b.total_cmp(a));

    let positives = ranked.iter().take_while(|(_, logit)| *logit > 0.0).count();
    ranked.truncate(positives.max(1));

    let intents: Vec<ScoredIntent> = ranked
        .into_iter()
        .filter_map(|(id, logit)| {
            let label = vocab.id2intent(id)?;
            let intent = label.split('+').next().unwrap_or(label);
            Some(ScoredIntent {
                label: label.to_string(),
                intent: intent.to_string(),
                logit,
            })
        })
        .collect();

    let top = &intents[0];
    Ok(Prediction {
        intent: top.intent.clone(),
        score: sigmoid(top.logit),
        intents,
    })
}

/// The JointBERT classifier with its tokenizer and label set, loaded once.
pub struct BertNlu {
    model: JointBert,
    encoder: Encoder,
    vocab: IntentVocab,
    device: Device,
    context_size: usize,
}

impl BertNlu {
    #[instrument(skip_all, fields(output_dir = %config.output_path().display()))]
    pub fn load(config: &NluConfig) -> Result<Self, NluError> {
        let device = if config.wants_cuda() {
            Device::cuda_if_available(0)?
        } else {
            Device::Cpu
        };
        debug!("using device {:?}", device);

        let vocab = IntentVocab::load(&config.intent_vocab_path())?;
        info!("intent num: {}", vocab.len());

        let (bert_config_path, tokenizer_path) = pretrained_files(config)?;
        let bert_config: BertConfig =
            serde_json::from_str(&std::fs::read_to_string(&bert_config_path)?)?;

        let max_seq_len = config
            .model
            .max_seq_len
            .min(bert_config.max_position_embeddings);
        let encoder = Encoder::from_file(&tokenizer_path, max_seq_len)?;

        let weights = weights_path(&config.output_path())?;
        info!("Load from {}", weights.display());
        let vb = if weights.extension().is_some_and(|ext| ext == "safetensors") {
            unsafe { VarBuilder::from_mmaped_safetensors(&[&weights], DType::F32, &device)? }
        } else {
            VarBuilder::from_pth(&weights, DType::F32, &device)?
        };

        let head = IntentHead {
            intent_dim: vocab.len(),
            hidden_units: config.model.hidden_units,
            context: config.model.context,
        };
        let model = JointBert::load(vb, &bert_config, head)?;
        info!("BERTNLU loaded");

        Ok(Self {
            model,
            encoder,
            vocab,
            device,
            context_size: config.model.context_size,
        })
    }
}

impl IntentNlu for BertNlu {
    #[instrument(skip(self, context), fields(context_turns = context.len()))]
    fn predict(&self, utterance: &str, context: &[String]) -> Result<Prediction, NluError> {
        let words = self.encoder.encode_utterance(utterance)?;
        let words = pad_batch(&[words], &self.device)?;

        // Context models always need a context sequence; an empty one is `[CLS] [SEP]`.
        let context = if self.model.uses_context() {
            let ids = match self.encoder.encode_context(context, self.context_size)? {
                Some(ids) => ids,
                None => self.encoder.encode_utterance("")?,
            };
            Some(pad_batch(&[ids], &self.device)?)
        } else {
            None
        };

        let logits = self.model.forward(&words, context.as_ref())?;
        let logits: Vec<f32> = logits.squeeze(0)?.to_dtype(DType::F32)?.to_vec1()?;
        recover_intents(&self.vocab, &logits)
    }

    fn intent_count(&self) -> usize {
        self.vocab.len()
    }
}

/// BERT `config.json` and `tokenizer.json`, from a local directory or the hub.
fn pretrained_files(config: &NluConfig) -> Result<(PathBuf, PathBuf), NluError> {
    if let Some(dir) = config.local_pretrained_dir() {
        return Ok((dir.join("config.json"), dir.join("tokenizer.json")));
    }

    info!(
        "fetching {} from the Hugging Face hub",
        config.model.pretrained_weights
    );
    let repo = Api::new()?.model(config.model.pretrained_weights.clone());
    Ok((repo.get("config.json")?, repo.get("tokenizer.json")?))
}

fn weights_path(output_dir: &Path) -> Result<PathBuf, NluError> {
    ["model.safetensors", "pytorch_model.bin"]
        .iter()
        .map(|name| output_dir.join(name))
        .find(|path| path.is_file())
        .ok_or_else(|| NluError::MissingWeights(output_dir.to_path_buf()))
}
