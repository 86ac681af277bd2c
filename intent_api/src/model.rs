// src/model.rs

//! Inference-only JointBERT intent head over candle's `BertModel`.

use super::tokenize::PaddedBatch;
use candle_core::{D, IndexOp, Module, Result, Tensor};
use candle_nn::{Linear, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};

/// Shape of the intent head, as it was trained.
#[derive(Debug, Clone, Copy)]
pub struct IntentHead {
    pub intent_dim: usize,
    pub hidden_units: usize,
    pub context: bool,
}

pub struct JointBert {
    bert: BertModel,
    pooler: Linear,
    intent_hidden: Option<Linear>,
    intent_classifier: Linear,
    context: bool,
}

impl JointBert {
    /// Loads from a checkpoint laid out as `bert.*`, `intent_hidden.*`, `intent_classifier.*`.
    pub fn load(vb: VarBuilder, config: &BertConfig, head: IntentHead) -> Result<Self> {
        let bert = BertModel::load(vb.pp("bert"), config)?;
        let hidden = config.hidden_size;
        let pooler = candle_nn::linear(hidden, hidden, vb.pp("bert.pooler.dense"))?;

        let pooled_dim = if head.context { 2 * hidden } else { hidden };
        let (intent_hidden, classifier_in) = if head.hidden_units > 0 {
            let layer = candle_nn::linear(pooled_dim, head.hidden_units, vb.pp("intent_hidden"))?;
            (Some(layer), head.hidden_units)
        } else {
            (None, pooled_dim)
        };
        let intent_classifier =
            candle_nn::linear(classifier_in, head.intent_dim, vb.pp("intent_classifier"))?;

        Ok(Self {
            bert,
            pooler,
            intent_hidden,
            intent_classifier,
            context: head.context,
        })
    }

    pub fn uses_context(&self) -> bool {
        self.context
    }

    // tanh(W * h_cls + b), the BERT pooler
    fn pooled(&self, batch: &PaddedBatch) -> Result<Tensor> {
        let sequence = self.bert.forward(
            &batch.input_ids,
            &batch.token_type_ids,
            Some(&batch.attention_mask),
        )?;
        let cls = sequence.i((.., 0))?;
        self.pooler.forward(&cls)?.tanh()
    }

    /// Intent logits, shaped `[batch, intent_dim]`.
    pub fn forward(&self, words: &PaddedBatch, context: Option<&PaddedBatch>) -> Result<Tensor> {
        let mut pooled = self.pooled(words)?;

        if self.context {
            let context = context.ok_or_else(|| {
                candle_core::Error::Msg("context model called without context ids".into())
            })?;
            let context_pooled = self.pooled(context)?;
            pooled = Tensor::cat(&[&context_pooled, &pooled], D::Minus1)?;
        }

        if let Some(hidden) = &self.intent_hidden {
            pooled = hidden.forward(&pooled)?.relu()?;
        }

        self.intent_classifier.forward(&pooled)
    }
}
