//! Builds the analysis instruction sent to the model.
//!
//! The aggregated article text is cut to the first [`TEXT_BUDGET`]
//! characters. The cut is not sentence aware and may split a word.

use tracing::debug;

/// Maximum number of characters of article text embedded in the prompt.
pub const TEXT_BUDGET: usize = 8000;

const INSTRUCTIONS: &[&str] = &[
    "Priorize as informações mais recentes e relevantes para o tema.",
    "Identifique tendências, riscos e oportunidades que aparecem nas notícias.",
    "Avalie o impacto específico para a organização e para o seu setor de atuação.",
    "Conclua com recomendações práticas e acionáveis para a tomada de decisão.",
];

/// Return at most `budget` characters from the start of `text`.
pub fn truncate_chars(text: &str, budget: usize) -> &str {
    match text.char_indices().nth(budget) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Assemble the instruction string from topic, directive and article text.
pub fn build_prompt(topic: &str, directive: &str, aggregated: &str) -> String {
    let text = truncate_chars(aggregated, TEXT_BUDGET);
    debug!(
        input_chars = aggregated.chars().count(),
        kept_chars = text.chars().count(),
        "Building analysis prompt"
    );

    let mut prompt = String::new();
    prompt.push_str("Você é um analista de mercado responsável por monitorar notícias.\n\n");
    prompt.push_str(&format!("Tema pesquisado: {}\n", topic.trim()));
    prompt.push_str(&format!("Diretriz de análise: {}\n\n", directive.trim()));
    prompt.push_str("Instruções:\n");
    for (i, instruction) in INSTRUCTIONS.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, instruction));
    }
    prompt.push_str("\nTexto das notícias:\n");
    prompt.push_str(text);
    prompt
}
