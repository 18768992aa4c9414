// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Florence-2 language decoder model
//!
//! Greedy autoregressive generation over the vision features. Token ids are
//! embedded with `embed_tokens.onnx` and fed to the decoder as
//! `inputs_embeds` together with the encoder states.

use anyhow::{Context, Result};
use ndarray::{Array2, Array3, Axis, Ix2};
use ort::session::Session;
use ort::value::Value;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::vision::session::{build_session, SessionOptions};

/// Default maximum new tokens
pub const DEFAULT_MAX_TOKENS: usize = 20;

/// Upper bound for new tokens
pub const MAX_TOKENS: usize = 500;

/// Number of most recent tokens excluded from the next step
const REPETITION_WINDOW: usize = 5;

/// Task prompt tokens and the natural language prompt they stand for
const TASK_PROMPTS: &[(&str, &str)] = &[
    ("<CAPTION>", "What does the image describe?"),
    (
        "<DETAILED_CAPTION>",
        "Describe in detail what is shown in the image.",
    ),
    (
        "<MORE_DETAILED_CAPTION>",
        "Describe with a paragraph what is shown in the image.",
    ),
    ("<OCR>", "What is the text in the image?"),
];

/// Expand a Florence-2 task token into its prompt text
///
/// Anything that is not a known task token is used verbatim.
pub fn expand_task_prompt(prompt: &str) -> &str {
    TASK_PROMPTS
        .iter()
        .find(|(task, _)| *task == prompt.trim())
        .map(|(_, text)| *text)
        .unwrap_or(prompt)
}

/// Pick the highest-scoring token not in `masked`
pub fn select_next_token(logits: &[f32], masked: &HashSet<u32>) -> Option<u32> {
    logits
        .iter()
        .enumerate()
        .filter(|(idx, _)| !masked.contains(&(*idx as u32)))
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(idx, _)| idx as u32)
}

/// Strip special and task markup from decoded text
pub fn clean_generated_text(text: &str) -> String {
    const MARKUP: &[&str] = &[
        "<s>", "</s>", "<pad>", "<cap>", "</cap>", "<dcap>", "</dcap>", "<ncap>", "</ncap>",
    ];
    let mut cleaned = text.to_string();
    for token in MARKUP {
        cleaned = cleaned.replace(token, "");
    }
    cleaned.trim().to_string()
}

/// Florence-2 decoder with its token embedding model and tokenizer
#[derive(Clone)]
pub struct FlorenceDecoder {
    session: Arc<Mutex<Session>>,
    embed_session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    max_tokens: usize,
    bos_token_id: u32,
    eos_token_id: u32,
}

impl std::fmt::Debug for FlorenceDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlorenceDecoder")
            .field("max_tokens", &self.max_tokens)
            .field("bos_token_id", &self.bos_token_id)
            .field("eos_token_id", &self.eos_token_id)
            .finish_non_exhaustive()
    }
}

impl FlorenceDecoder {
    /// Load `decoder`, `embed_tokens.onnx` (next to it) and `tokenizer.json`
    pub fn new(
        model_path: &Path,
        embed_path: &Path,
        tokenizer_path: &Path,
        options: &SessionOptions,
    ) -> Result<Self> {
        if !model_path.exists() {
            anyhow::bail!("Florence decoder model not found: {}", model_path.display());
        }
        if !tokenizer_path.exists() {
            anyhow::bail!("Florence tokenizer not found: {}", tokenizer_path.display());
        }
        if !embed_path.exists() {
            anyhow::bail!(
                "Florence embed_tokens model not found: {}",
                embed_path.display()
            );
        }

        info!("Loading Florence decoder from {}", model_path.display());

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
        info!(
            "Loaded tokenizer with {} tokens",
            tokenizer.get_vocab_size(true)
        );

        let embed_session = build_session(embed_path, options)
            .context("Failed to load embed_tokens model")?;
        let session = build_session(model_path, options)
            .context("Failed to load Florence decoder model")?;

        let input_names: Vec<_> = session.inputs.iter().map(|i| &i.name).collect();
        debug!("Decoder inputs: {:?}", input_names);

        let bos_token_id = tokenizer.token_to_id("<s>").unwrap_or(0);
        let eos_token_id = tokenizer.token_to_id("</s>").unwrap_or(2);

        info!("✅ Florence decoder loaded on {}", options.device);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            embed_session: Arc::new(Mutex::new(embed_session)),
            tokenizer: Arc::new(tokenizer),
            max_tokens: DEFAULT_MAX_TOKENS,
            bos_token_id,
            eos_token_id,
        })
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens.clamp(1, MAX_TOKENS);
        self
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Generate text for image features, conditioned on a prompt
    ///
    /// Only the newly generated tokens are decoded; the prompt is not echoed.
    pub fn generate(&self, image_embeddings: &Array2<f32>, prompt: &str) -> Result<String> {
        let prompt_text = expand_task_prompt(prompt);
        let encoding = self
            .tokenizer
            .encode(prompt_text, false)
            .map_err(|e| anyhow::anyhow!("Failed to encode prompt: {}", e))?;

        let mut tokens = vec![self.bos_token_id];
        tokens.extend(
            encoding
                .get_ids()
                .iter()
                .copied()
                .filter(|&id| id != self.bos_token_id && id != self.eos_token_id),
        );
        let prompt_len = tokens.len();

        let encoder_states = image_embeddings.clone().insert_axis(Axis(0));

        for _ in 0..self.max_tokens {
            let logits = self.forward(&encoder_states, &tokens)?;

            let masked: HashSet<u32> = tokens[prompt_len..]
                .iter()
                .rev()
                .take(REPETITION_WINDOW)
                .copied()
                .chain(std::iter::once(self.bos_token_id))
                .collect();

            let next_token = select_next_token(&logits, &masked)
                .ok_or_else(|| anyhow::anyhow!("Empty logits vector after filtering"))?;

            if next_token == self.eos_token_id {
                break;
            }
            tokens.push(next_token);
        }

        let generated = &tokens[prompt_len..];
        let text = self
            .tokenizer
            .decode(generated, true)
            .map_err(|e| anyhow::anyhow!("Decoding failed: {}", e))?;

        debug!("Generated {} tokens", generated.len());
        Ok(clean_generated_text(&text))
    }

    /// Convert token ids to embeddings
    fn embed_tokens(&self, input_ids: &[u32]) -> Result<Array3<f32>> {
        let ids: Vec<i64> = input_ids.iter().map(|&t| t as i64).collect();
        let ids = Array2::from_shape_vec((1, ids.len()), ids)
            .context("Failed to shape input ids")?;

        let mut embed_session = self
            .embed_session
            .lock()
            .map_err(|_| anyhow::anyhow!("embed_tokens session lock poisoned"))?;

        let ids_value =
            Value::from_array(ids).context("Failed to create input IDs tensor for embedding")?;
        let outputs = embed_session
            .run(ort::inputs!["input_ids" => ids_value])
            .context("embed_tokens inference failed")?;

        let embeddings = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract embeddings tensor")?;

        embeddings
            .to_owned()
            .into_dimensionality::<ndarray::Ix3>()
            .context("Unexpected embed_tokens output shape")
    }

    /// One decoder step, returning the logits of the last position
    fn forward(&self, encoder_states: &Array3<f32>, input_ids: &[u32]) -> Result<Vec<f32>> {
        let inputs_embeds = self.embed_tokens(input_ids)?;
        let encoder_attention_mask = Array2::<i64>::ones((1, encoder_states.shape()[1]));

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("Florence decoder session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![
                "encoder_hidden_states" => Value::from_array(encoder_states.clone())
                    .context("Failed to create encoder hidden states tensor")?,
                "encoder_attention_mask" => Value::from_array(encoder_attention_mask)
                    .context("Failed to create encoder attention mask tensor")?,
                "inputs_embeds" => Value::from_array(inputs_embeds)
                    .context("Failed to create inputs_embeds tensor")?
            ])
            .context("Decoder inference failed")?;

        let logits = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        // [1, seq, vocab] -> [seq, vocab]
        let mut view = logits.view();
        while view.ndim() > 2 {
            view = view.index_axis_move(Axis(0), 0);
        }
        let view = view
            .into_dimensionality::<Ix2>()
            .context("Unexpected decoder output shape")?;

        let last = view
            .rows()
            .into_iter()
            .last()
            .ok_or_else(|| anyhow::anyhow!("Decoder returned no positions"))?;

        Ok(last.to_vec())
    }
}
