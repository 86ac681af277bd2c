// src/tokenize.rs

use super::error::NluError;
use candle_core::{Device, Tensor};
use std::collections::HashMap;
use std::path::Path;
use tokenizers::{Tokenizer, TruncationDirection, TruncationParams};

/// Intent labels in classifier output order.
#[derive(Debug, Clone)]
pub struct IntentVocab {
    id2intent: Vec<String>,
    intent2id: HashMap<String, usize>,
}

impl IntentVocab {
    pub fn new(id2intent: Vec<String>) -> Self {
        let intent2id = id2intent
            .iter()
            .enumerate()
            .map(|(i, label)| (label.clone(), i))
            .collect();
        Self {
            id2intent,
            intent2id,
        }
    }

    pub fn load(path: &Path) -> Result<Self, NluError> {
        let raw = std::fs::read_to_string(path)?;
        let labels: Vec<String> = serde_json::from_str(&raw)?;
        if labels.is_empty() {
            return Err(NluError::EmptyVocab(path.to_path_buf()));
        }
        Ok(Self::new(labels))
    }

    pub fn id2intent(&self, id: usize) -> Option<&str> {
        self.id2intent.get(id).map(String::as_str)
    }

    pub fn intent2id(&self, label: &str) -> Option<usize> {
        self.intent2id.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.id2intent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id2intent.is_empty()
    }
}

/// WordPiece encoding of utterances and dialogue context.
///
/// Padding baked into `tokenizer.json` is switched off; batches are padded by
/// [`pad_batch`] so the attention mask only covers real tokens.
pub struct Encoder {
    utterance: Tokenizer,
    context: Tokenizer,
}

fn with_truncation(
    tokenizer: &mut Tokenizer,
    max_length: usize,
    direction: TruncationDirection,
) -> Result<(), NluError> {
    tokenizer.with_padding(None);
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            direction,
            ..Default::default()
        }))
        .map_err(|e| NluError::Tokenizer(e.to_string()))?;
    Ok(())
}

impl Encoder {
    pub fn from_file(path: &Path, max_seq_len: usize) -> Result<Self, NluError> {
        let tokenizer =
            Tokenizer::from_file(path).map_err(|e| NluError::Tokenizer(e.to_string()))?;
        Self::new(tokenizer, max_seq_len)
    }

    /// Utterances keep their head, context keeps its most recent tokens.
    /// Both keep `[CLS]` and `[SEP]` within `max_seq_len`.
    pub fn new(tokenizer: Tokenizer, max_seq_len: usize) -> Result<Self, NluError> {
        let max_seq_len = max_seq_len.max(2);
        let mut utterance = tokenizer.clone();
        with_truncation(&mut utterance, max_seq_len, TruncationDirection::Right)?;
        let mut context = tokenizer;
        with_truncation(&mut context, max_seq_len, TruncationDirection::Left)?;
        Ok(Self { utterance, context })
    }

    fn encode(tokenizer: &Tokenizer, text: &str) -> Result<Vec<u32>, NluError> {
        let encoding = tokenizer
            .encode(text, true)
            .map_err(|e| NluError::Tokenizer(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }

    /// `[CLS] utterance [SEP]`.
    pub fn encode_utterance(&self, text: &str) -> Result<Vec<u32>, NluError> {
        Self::encode(&self.utterance, text)
    }

    /// `[CLS] turn [SEP] turn [SEP]` over the last `context_size` turns.
    pub fn encode_context(
        &self,
        turns: &[String],
        context_size: usize,
    ) -> Result<Option<Vec<u32>>, NluError> {
        let Some(joined) = join_context(turns, context_size) else {
            return Ok(None);
        };
        Self::encode(&self.context, &joined).map(Some)
    }
}

pub fn join_context(turns: &[String], context_size: usize) -> Option<String> {
    let start = turns.len().saturating_sub(context_size);
    let recent = &turns[start..];
    if recent.is_empty() {
        return None;
    }
    Some(recent.join(" [SEP] "))
}

/// Padded model inputs, each shaped `[batch, max_len]`.
pub struct PaddedBatch {
    pub input_ids: Tensor,
    pub token_type_ids: Tensor,
    pub attention_mask: Tensor,
}

pub fn pad_batch(seqs: &[Vec<u32>], device: &Device) -> candle_core::Result<PaddedBatch> {
    let batch = seqs.len();
    let max_len = seqs.iter().map(Vec::len).max().unwrap_or(0);

    let mut ids = vec![0u32; batch * max_len];
    let mut mask = vec![0u32; batch * max_len];
    for (row, seq) in seqs.iter().enumerate() {
        let offset = row * max_len;
        ids[offset..offset + seq.len()].copy_from_slice(seq);
        mask[offset..offset + seq.len()].fill(1);
    }

    let input_ids = Tensor::from_vec(ids, (batch, max_len), device)?;
    let attention_mask = Tensor::from_vec(mask, (batch, max_len), device)?;
    let token_type_ids = input_ids.zeros_like()?;

    Ok(PaddedBatch {
        input_ids,
        token_type_ids,
        attention_mask,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vocab_maps_both_ways() {
        let vocab = IntentVocab::new(vec!["Inform".into(), "Request".into(), "greet".into()]);
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.id2intent(1), Some("Request"));
        assert_eq!(vocab.intent2id("greet"), Some(2));
        assert_eq!(vocab.id2intent(3), None);
        assert_eq!(vocab.intent2id("bye"), None);
    }

    #[test]
    fn vocab_loads_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intent_vocab.json");
        std::fs::write(&path, r#"["Inform+景点+名称", "General+greet+none+none"]"#).unwrap();
        let vocab = IntentVocab::load(&path).unwrap();
        assert_eq!(vocab.len(), 2);
        assert_eq!(vocab.id2intent(0), Some("Inform+景点+名称"));
    }

    #[test]
    fn empty_vocab_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intent_vocab.json");
        std::fs::write(&path, "[]").unwrap();
        assert!(matches!(IntentVocab::load(&path), Err(NluError::EmptyVocab(_))));
    }

    #[test]
    fn context_uses_last_turns() {
        let turns: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
        assert_eq!(join_context(&turns, 1).as_deref(), Some("c"));
        assert_eq!(join_context(&turns, 2).as_deref(), Some("b [SEP] c"));
        assert_eq!(join_context(&turns, 10).as_deref(), Some("a [SEP] b [SEP] c"));
        assert_eq!(join_context(&turns, 0), None);
        assert_eq!(join_context(&[], 1), None);
    }

    fn special(id: u32, content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id, "content": content, "single_word": false, "lstrip": false,
            "rstrip": false, "normalized": false, "special": true
        })
    }

    // WordLevel tokenizer whose JSON pads to 6 and truncates at 100.
    fn padded_tokenizer() -> Tokenizer {
        let json = serde_json::json!({
            "version": "1.0",
            "truncation": {
                "direction": "Right", "max_length": 100,
                "strategy": "LongestFirst", "stride": 0
            },
            "padding": {
                "strategy": {"Fixed": 6}, "direction": "Right", "pad_to_multiple_of": null,
                "pad_id": 0, "pad_type_id": 0, "pad_token": "[PAD]"
            },
            "added_tokens": [special(0, "[PAD]"), special(1, "[UNK]"), special(2, "[CLS]"), special(3, "[SEP]")],
            "normalizer": null,
            "pre_tokenizer": {"type": "Whitespace"},
            "post_processor": {"type": "BertProcessing", "sep": ["[SEP]", 3], "cls": ["[CLS]", 2]},
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": {
                    "[PAD]": 0, "[UNK]": 1, "[CLS]": 2, "[SEP]": 3,
                    "hello": 4, "where": 5, "is": 6, "the": 7, "hotel": 8
                },
                "unk_token": "[UNK]"
            }
        });
        json.to_string().parse().unwrap()
    }

    #[test]
    fn baked_in_padding_is_ignored() {
        let encoder = Encoder::new(padded_tokenizer(), 4).unwrap();
        let ids = encoder.encode_utterance("hello").unwrap();
        assert_eq!(ids, vec![2, 4, 3]);

        let batch = pad_batch(&[ids], &Device::Cpu).unwrap();
        assert_eq!(batch.attention_mask.to_vec2::<u32>().unwrap(), vec![vec![1, 1, 1]]);
    }

    #[test]
    fn utterance_keeps_head_and_sep() {
        let encoder = Encoder::new(padded_tokenizer(), 4).unwrap();
        let ids = encoder.encode_utterance("where is the hotel").unwrap();
        assert_eq!(ids, vec![2, 5, 6, 3]);
    }

    #[test]
    fn context_keeps_most_recent_tokens() {
        let encoder = Encoder::new(padded_tokenizer(), 4).unwrap();
        let turns = vec!["hello".to_string(), "where is the hotel".to_string()];
        let ids = encoder.encode_context(&turns, 1).unwrap().unwrap();
        assert_eq!(ids, vec![2, 7, 8, 3]);
        assert_eq!(encoder.encode_context(&[], 1).unwrap(), None);
    }

    #[test]
    fn pad_batch_masks_padding() {
        let seqs = vec![vec![101, 7, 102], vec![101, 102]];
        let batch = pad_batch(&seqs, &Device::Cpu).unwrap();
        assert_eq!(batch.input_ids.dims(), &[2, 3]);
        assert_eq!(
            batch.input_ids.to_vec2::<u32>().unwrap(),
            vec![vec![101, 7, 102], vec![101, 102, 0]]
        );
        assert_eq!(
            batch.attention_mask.to_vec2::<u32>().unwrap(),
            vec![vec![1, 1, 1], vec![1, 1, 0]]
        );
        assert_eq!(
            batch.token_type_ids.to_vec2::<u32>().unwrap(),
            vec![vec![0, 0, 0], vec![0, 0, 0]]
        );
    }
}
