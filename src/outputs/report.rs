//! Layout of the executive report, independent of the output format.
//!
//! [`layout`] turns a [`ReportRequest`] into a [`ReportDocument`]: a fixed
//! sequence of sections whose paragraphs are runs of styled [`Span`]s.
//!
//! # Sections
//!
//! | Section | Content |
//! |---------|---------|
//! | header | title, generation time, model |
//! | Resumo Executivo | first paragraph of the analysis |
//! | Escopo da Análise | topic and directive |
//! | Análise Detalhada | paragraphs between the first and the last |
//! | Fontes | numbered source URLs |
//! | Conclusão | last paragraph of the analysis |
//!
//! # Markup
//!
//! `**bold**`, `*italic*`, `__underline__` and `~~strike~~` wrappers, and
//! lines made only of three or more `-`, `*` or `_` (horizontal rules).
//! Numbers, percentages and `R$` amounts are highlighted. Anything else,
//! unmatched markers included, is kept as literal text.

use crate::models::ReportRequest;
use once_cell::sync::Lazy;
use regex::Regex;

pub const REPORT_TITLE: &str = "Relatório Executivo";

static INLINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*\*(?P<bold>[^*]+?)\*\*|__(?P<under>[^_]+?)__|~~(?P<strike>[^~]+?)~~|\*(?P<italic>[^*\s][^*]*?)\*")
        .expect("valid regex")
});
static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:R\$\s?)?\d+(?:[.,]\d+)*%?").expect("valid regex"));
static RULE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(?:-{3,}|\*{3,}|_{3,})\s*$").expect("valid regex"));
static BLANK_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").expect("valid regex"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Style {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    /// Numeric token, drawn in the accent colour.
    pub highlight: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: Style,
}

impl Span {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: Style::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(Vec<Span>),
    Rule,
    /// A numbered source link.
    Source { index: usize, url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDocument {
    pub title: String,
    /// Lines printed under the title.
    pub header: Vec<String>,
    pub sections: Vec<Section>,
}

/// Lay out the report for `request`; `generated_at` is printed verbatim.
pub fn layout(request: &ReportRequest, generated_at: &str) -> ReportDocument {
    let paragraphs = split_paragraphs(&request.analysis);
    let summary = paragraphs.first().copied().unwrap_or_default();
    let conclusion = paragraphs.last().copied().unwrap_or_default();
    let middle: &[&str] = if paragraphs.len() > 2 {
        &paragraphs[1..paragraphs.len() - 1]
    } else {
        &[]
    };

    let mut analysis_blocks: Vec<Block> = middle.iter().flat_map(|p| paragraph_blocks(p)).collect();
    if analysis_blocks.is_empty() {
        analysis_blocks.push(Block::Paragraph(vec![Span::plain("—")]));
    }

    let sources = if request.sources.is_empty() {
        vec![Block::Paragraph(vec![Span::plain("Nenhuma fonte disponível.")])]
    } else {
        request
            .sources
            .iter()
            .enumerate()
            .map(|(i, url)| Block::Source {
                index: i + 1,
                url: url.clone(),
            })
            .collect()
    };

    ReportDocument {
        title: REPORT_TITLE.to_string(),
        header: vec![
            format!("Gerado em {generated_at}"),
            format!("Modelo de IA: {}", request.model),
        ],
        sections: vec![
            Section {
                title: "Resumo Executivo".to_string(),
                blocks: paragraph_blocks(summary),
            },
            Section {
                title: "Escopo da Análise".to_string(),
                blocks: vec![
                    labelled("Tema: ", &request.topic),
                    labelled("Diretriz: ", &request.directive),
                ],
            },
            Section {
                title: "Análise Detalhada".to_string(),
                blocks: analysis_blocks,
            },
            Section {
                title: "Fontes".to_string(),
                blocks: sources,
            },
            Section {
                title: "Conclusão".to_string(),
                blocks: paragraph_blocks(conclusion),
            },
        ],
    }
}

/// Non-empty paragraphs separated by blank lines.
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    BLANK_LINE
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// One block per line: rules for rule lines, styled paragraphs otherwise.
fn paragraph_blocks(paragraph: &str) -> Vec<Block> {
    paragraph
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            if RULE.is_match(line) {
                Block::Rule
            } else {
                Block::Paragraph(parse_inline(line.trim()))
            }
        })
        .collect()
}

fn labelled(label: &str, value: &str) -> Block {
    let mut spans = vec![Span {
        text: label.to_string(),
        style: Style {
            bold: true,
            ..Style::default()
        },
    }];
    spans.extend(highlight_numbers(value, Style::default()));
    Block::Paragraph(spans)
}

/// Translate inline markup into styled spans.
pub fn parse_inline(line: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut last = 0;
    for caps in INLINE.captures_iter(line) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        spans.extend(highlight_numbers(&line[last..whole.start()], Style::default()));

        let mut style = Style::default();
        let inner = if let Some(m) = caps.name("bold") {
            style.bold = true;
            m
        } else if let Some(m) = caps.name("under") {
            style.underline = true;
            m
        } else if let Some(m) = caps.name("strike") {
            style.strike = true;
            m
        } else if let Some(m) = caps.name("italic") {
            style.italic = true;
            m
        } else {
            whole
        };
        spans.extend(highlight_numbers(inner.as_str(), style));
        last = whole.end();
    }
    spans.extend(highlight_numbers(&line[last..], Style::default()));
    spans
}

/// Split `text` into spans, marking numeric tokens as highlighted.
fn highlight_numbers(text: &str, style: Style) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut last = 0;
    for m in NUMBER.find_iter(text) {
        if m.start() > last {
            spans.push(Span {
                text: text[last..m.start()].to_string(),
                style,
            });
        }
        spans.push(Span {
            text: m.as_str().to_string(),
            style: Style {
                highlight: true,
                ..style
            },
        });
        last = m.end();
    }
    if last < text.len() {
        spans.push(Span {
            text: text[last..].to_string(),
            style,
        });
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(analysis: &str) -> ReportRequest {
        ReportRequest {
            topic: "taxa Selic".to_string(),
            directive: "resuma em 3 pontos".to_string(),
            analysis: analysis.to_string(),
            sources: vec![
                "https://g1.globo.com/economia/selic.ghtml".to_string(),
                "https://valor.globo.com/financas/copom.ghtml".to_string(),
            ],
            model: "gpt-4o-mini".to_string(),
        }
    }

    fn text_of(block: &Block) -> String {
        match block {
            Block::Paragraph(spans) => spans.iter().map(|s| s.text.as_str()).collect(),
            Block::Rule => "<hr>".to_string(),
            Block::Source { index, url } => format!("{index}. {url}"),
        }
    }

    #[test]
    fn test_sections_follow_paragraphs() {
        let doc = layout(
            &request("Resumo inicial.\n\nPonto um.\n\nPonto dois.\n\nConclusão final."),
            "07/03/2025 09:05",
        );
        let titles: Vec<_> = doc.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Resumo Executivo", "Escopo da Análise", "Análise Detalhada", "Fontes", "Conclusão"]
        );
        assert_eq!(text_of(&doc.sections[0].blocks[0]), "Resumo inicial.");
        assert_eq!(text_of(&doc.sections[1].blocks[0]), "Tema: taxa Selic");
        assert_eq!(text_of(&doc.sections[1].blocks[1]), "Diretriz: resuma em 3 pontos");
        let analysis: Vec<_> = doc.sections[2].blocks.iter().map(text_of).collect();
        assert_eq!(analysis, vec!["Ponto um.", "Ponto dois."]);
        assert_eq!(
            text_of(&doc.sections[3].blocks[1]),
            "2. https://valor.globo.com/financas/copom.ghtml"
        );
        assert_eq!(text_of(&doc.sections[4].blocks[0]), "Conclusão final.");
        assert_eq!(doc.header[0], "Gerado em 07/03/2025 09:05");
        assert_eq!(doc.header[1], "Modelo de IA: gpt-4o-mini");
    }

    #[test]
    fn test_single_paragraph_analysis() {
        let doc = layout(&request("Apenas um parágrafo."), "agora");
        assert_eq!(text_of(&doc.sections[0].blocks[0]), "Apenas um parágrafo.");
        assert_eq!(text_of(&doc.sections[2].blocks[0]), "—");
        assert_eq!(text_of(&doc.sections[4].blocks[0]), "Apenas um parágrafo.");
    }

    #[test]
    fn test_layout_is_deterministic() {
        let req = request("A.\n\n**B** 10%\n\n---\n\nC.");
        assert_eq!(layout(&req, "t"), layout(&req, "t"));
    }

    #[test]
    fn test_rules_inside_analysis() {
        let doc = layout(&request("Resumo.\n\nAntes\n---\nDepois\n\nFim."), "t");
        let analysis: Vec<_> = doc.sections[2].blocks.iter().map(text_of).collect();
        assert_eq!(analysis, vec!["Antes", "<hr>", "Depois"]);
    }

    #[test]
    fn test_inline_styles() {
        let spans = parse_inline("**Alta** do *dólar* e __risco__ ~~baixo~~");
        let styled: Vec<_> = spans
            .iter()
            .filter(|s| s.style != Style::default())
            .map(|s| (s.text.as_str(), s.style))
            .collect();
        assert_eq!(
            styled,
            vec![
                ("Alta", Style { bold: true, ..Style::default() }),
                ("dólar", Style { italic: true, ..Style::default() }),
                ("risco", Style { underline: true, ..Style::default() }),
                ("baixo", Style { strike: true, ..Style::default() }),
            ]
        );
    }

    #[test]
    fn test_unrecognized_markup_is_literal() {
        let text = "### Título com **negrito sem fim e `código`";
        let spans = parse_inline(text);
        let joined: String = spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(joined, text);
        assert!(spans.iter().all(|s| !s.style.bold));
    }

    #[test]
    fn test_numbers_are_highlighted() {
        let spans = parse_inline("Selic em 10,75% e dólar a R$ 5,20 em 2025.");
        let highlighted: Vec<_> = spans
            .iter()
            .filter(|s| s.style.highlight)
            .map(|s| s.text.as_str())
            .collect();
        assert_eq!(highlighted, vec!["10,75%", "R$ 5,20", "2025"]);
    }

    #[test]
    fn test_highlight_keeps_wrapper_style() {
        let spans = parse_inline("**alta de 3%**");
        assert_eq!(
            spans,
            vec![
                Span {
                    text: "alta de ".to_string(),
                    style: Style { bold: true, ..Style::default() },
                },
                Span {
                    text: "3%".to_string(),
                    style: Style { bold: true, highlight: true, ..Style::default() },
                },
            ]
        );
    }

    #[test]
    fn test_sources_fallback() {
        let mut req = request("Resumo.");
        req.sources.clear();
        let doc = layout(&req, "t");
        assert_eq!(text_of(&doc.sections[3].blocks[0]), "Nenhuma fonte disponível.");
    }
}
