//! Generic news article extractor.
//!
//! Unlike a site-specific scraper this works on arbitrary news pages: it
//! drops page chrome (`script`, `style`, `nav`, `header`, `footer`), keeps
//! paragraphs, headings and article/section text longer than
//! [`MIN_FRAGMENT_CHARS`], renders tables as pipe-delimited rows and picks
//! up to [`MAX_IMAGES`] images.
//!
//! # Table Format
//!
//! ```text
//! Mês | Taxa
//! --- | ---
//! Jan | 5%
//! ```

use super::Extractor;
use crate::error::FetchError;
use crate::models::{ExtractedDocument, ImageRef};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Browser-like User-Agent sent with every page request.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36";

/// Per-request timeout for page fetches.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Fragments this short or shorter are treated as boilerplate.
pub const MIN_FRAGMENT_CHARS: usize = 20;

/// Maximum number of image references kept per page.
pub const MAX_IMAGES: usize = 10;

const STRIPPED: &[&str] = &["script", "style", "nav", "header", "footer", "noscript"];

static PROSE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("p, article, section, h1, h2, h3, h4, h5, h6").expect("valid selector")
});
static NESTED_PROSE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("p, article, section, h1, h2, h3, h4, h5, h6").expect("valid selector")
});
static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").expect("valid selector"));
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("valid selector"));
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("th, td").expect("valid selector"));
static IMAGE: Lazy<Selector> = Lazy::new(|| Selector::parse("img[src]").expect("valid selector"));

static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[^\w\s.,;:!?()\[\]'"%$/|&@#+=*-]"#).expect("valid regex"));
static HORIZONTAL_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\S\n]+").expect("valid regex"));

/// HTTP implementation of [`Extractor`].
#[derive(Debug, Clone)]
pub struct ArticleExtractor {
    client: Client,
}

impl ArticleExtractor {
    /// Build a client with the fixed User-Agent and timeout.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

impl Extractor for ArticleExtractor {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn extract(&self, url: &str) -> Result<ExtractedDocument, FetchError> {
        let t0 = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Page fetch returned non-success status");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })?;

        let document = extract_from_html(&body, url);
        info!(
            bytes = document.text.len(),
            images = document.images.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Parsed article"
        );
        Ok(document)
    }
}

/// Reduce an HTML page to cleaned text, tables and image references.
pub fn extract_from_html(html: &str, page_url: &str) -> ExtractedDocument {
    let document = Html::parse_document(html);

    let mut fragments = Vec::new();
    for element in document.select(&PROSE) {
        if in_stripped(&element) || has_ancestor(&element, &["table"]) {
            continue;
        }
        let name = element.value().name();
        if (name == "article" || name == "section") && element.select(&NESTED_PROSE).next().is_some()
        {
            // collected through its own paragraphs, headings or inner containers
            continue;
        }
        let text = collapse_whitespace(&visible_text(&element));
        if text.chars().count() > MIN_FRAGMENT_CHARS {
            fragments.push(text);
        }
    }

    let tables: Vec<String> = document
        .select(&TABLE)
        .filter(|t| !in_stripped(t))
        .filter_map(|t| render_table(&t))
        .collect();

    let mut raw = fragments.join("\n");
    if !tables.is_empty() {
        if !raw.is_empty() {
            raw.push_str("\n\n");
        }
        raw.push_str(&tables.join("\n\n"));
    }

    let images = collect_images(&document, page_url);
    debug!(
        fragments = fragments.len(),
        tables = tables.len(),
        images = images.len(),
        "Extracted page content"
    );

    ExtractedDocument {
        source: page_url.to_string(),
        text: clean_text(&raw),
        images,
    }
}

/// Render a table as a header row, a `---` rule and one line per data row.
///
/// Returns `None` for tables without any non-empty cell.
pub fn render_table(table: &ElementRef) -> Option<String> {
    let rows: Vec<Vec<String>> = table
        .select(&ROW)
        .map(|row| {
            row.select(&CELL)
                .map(|cell| collapse_whitespace(&visible_text(&cell)))
                .collect::<Vec<_>>()
        })
        .filter(|cells| cells.iter().any(|c| !c.is_empty()))
        .collect();

    let (header, body) = rows.split_first()?;
    let mut lines = vec![header.iter().join(" | ")];
    lines.push(header.iter().map(|_| "---").join(" | "));
    lines.extend(body.iter().map(|row| row.iter().join(" | ")));
    Some(lines.join("\n"))
}

/// Strip characters outside the allow-list and collapse whitespace runs.
///
/// Line breaks survive so that table rows stay on their own lines; blank
/// runs are squeezed to a single empty line.
pub fn clean_text(raw: &str) -> String {
    let allowed = DISALLOWED.replace_all(raw, "");
    let collapsed = HORIZONTAL_WS.replace_all(&allowed, " ");

    let mut out: Vec<&str> = Vec::new();
    for line in collapsed.lines().map(str::trim) {
        if line.is_empty() && out.last().is_none_or(|l| l.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().join(" ")
}

fn collect_images(document: &Html, page_url: &str) -> Vec<ImageRef> {
    let base = Url::parse(page_url).ok();
    document
        .select(&IMAGE)
        .filter(|img| !in_stripped(img))
        .filter_map(|img| {
            let src = img.value().attr("src")?.trim();
            let resolved = match &base {
                Some(base) => base.join(src).ok()?,
                None => Url::parse(src).ok()?,
            };
            if !matches!(resolved.scheme(), "http" | "https") {
                return None;
            }
            Some(ImageRef {
                url: resolved.to_string(),
                alt: img.value().attr("alt").unwrap_or_default().trim().to_string(),
            })
        })
        .take(MAX_IMAGES)
        .collect()
}

/// Concatenated text of `element`, skipping anything under stripped tags.
///
/// Nested tables are skipped as well; [`render_table`] emits them.
fn visible_text(element: &ElementRef) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .take_while(|a| a.id() != element.id())
            .filter_map(|a| a.value().as_element())
            .any(|e| e.name() == "table" || STRIPPED.contains(&e.name()));
        if !hidden {
            out.push_str(&**text);
            out.push(' ');
        }
    }
    out
}

fn in_stripped(element: &ElementRef) -> bool {
    STRIPPED.contains(&element.value().name()) || has_ancestor(element, STRIPPED)
}

fn has_ancestor(element: &ElementRef, names: &[&str]) -> bool {
    element
        .ancestors()
        .filter_map(|a| a.value().as_element())
        .any(|e| names.contains(&e.name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::serve_once;

    const PAGE: &str = r#"
        <html>
          <head><style>p { color: red; }</style><script>var x = "não mostrar";</script></head>
          <body>
            <header><p>Cabeçalho do portal com menu e assinatura</p></header>
            <nav><p>Economia Política Esportes Entretenimento</p></nav>
            <article>
              <h1>Copom mantém a taxa Selic em 10,75% ao ano</h1>
              <p>O Comitê de Política Monetária decidiu   manter
                 a taxa básica de juros pela terceira vez seguida.</p>
              <p>Curto.</p>
              <p>Analistas esperam cortes a partir do segundo semestre <script>track()</script>de 2025.</p>
              <img src="/imagens/copom.jpg" alt="Reunião do Copom">
              <img src="https://cdn.example.com/grafico.png">
            </article>
            <footer><p>Todos os direitos reservados ao portal de notícias</p></footer>
          </body>
        </html>
    "#;

    #[test]
    fn test_extracts_paragraphs_and_headings() {
        let doc = extract_from_html(PAGE, "https://noticias.example.com/economia/copom");
        assert!(doc.text.contains("Copom mantém a taxa Selic em 10,75% ao ano"));
        assert!(doc.text.contains(
            "O Comitê de Política Monetária decidiu manter a taxa básica de juros pela terceira vez seguida."
        ));
        assert!(doc.text.contains("Analistas esperam cortes a partir do segundo semestre de 2025."));
        assert_eq!(doc.source, "https://noticias.example.com/economia/copom");
    }

    #[test]
    fn test_strips_chrome_scripts_and_short_fragments() {
        let doc = extract_from_html(PAGE, "https://noticias.example.com/economia/copom");
        assert!(!doc.text.contains("Cabeçalho"));
        assert!(!doc.text.contains("Esportes"));
        assert!(!doc.text.contains("direitos reservados"));
        assert!(!doc.text.contains("track"));
        assert!(!doc.text.contains("color"));
        assert!(!doc.text.contains("Curto."));
    }

    #[test]
    fn test_resolves_root_relative_images() {
        let doc = extract_from_html(PAGE, "https://noticias.example.com/economia/copom");
        assert_eq!(
            doc.images,
            vec![
                ImageRef {
                    url: "https://noticias.example.com/imagens/copom.jpg".to_string(),
                    alt: "Reunião do Copom".to_string(),
                },
                ImageRef {
                    url: "https://cdn.example.com/grafico.png".to_string(),
                    alt: String::new(),
                },
            ]
        );
    }

    #[test]
    fn test_image_count_is_bounded() {
        let imgs = (0..25)
            .map(|i| format!(r#"<img src="/img/{i}.png" alt="foto {i}">"#))
            .collect::<String>();
        let html = format!("<html><body>{imgs}</body></html>");
        let doc = extract_from_html(&html, "https://example.com/a");
        assert_eq!(doc.images.len(), MAX_IMAGES);
        assert_eq!(doc.images[0].url, "https://example.com/img/0.png");
    }

    #[test]
    fn test_table_is_rendered_pipe_delimited() {
        let html = r#"
            <html><body>
              <p>A tabela abaixo mostra a evolução mensal da taxa.</p>
              <table>
                <tr><th>Mês</th><th>Taxa</th></tr>
                <tr><td>Jan</td><td>5%</td></tr>
              </table>
            </body></html>
        "#;
        let doc = extract_from_html(html, "https://example.com/tabela");
        let lines: Vec<&str> = doc.text.lines().collect();
        let header = lines.iter().position(|l| *l == "Mês | Taxa").unwrap();
        assert_eq!(lines[header + 1], "--- | ---");
        assert_eq!(lines[header + 2], "Jan | 5%");
        assert!(lines[0].starts_with("A tabela abaixo"));
    }

    #[test]
    fn test_empty_table_is_skipped() {
        let html = "<html><body><table><tr><td> </td></tr></table></body></html>";
        let doc = extract_from_html(html, "https://example.com/");
        assert!(doc.is_empty());
    }

    #[test]
    fn test_section_without_paragraphs_is_kept() {
        let html = "<html><body><section>Texto solto dentro de uma seção sem parágrafos</section></body></html>";
        let doc = extract_from_html(html, "https://example.com/");
        assert_eq!(doc.text, "Texto solto dentro de uma seção sem parágrafos");
    }

    #[test]
    fn test_table_inside_article_is_not_repeated_as_prose() {
        let html = r#"
            <html><body><article>
              Evolução da taxa básica de juros no ano
              <table>
                <tr><th>Mês</th><th>Taxa</th></tr>
                <tr><td>Janeiro de 2025</td><td>5%</td></tr>
              </table>
            </article></body></html>
        "#;
        let doc = extract_from_html(html, "https://example.com/tabela");
        assert_eq!(doc.text.matches("Janeiro de 2025").count(), 1);
        assert!(doc.text.contains("Janeiro de 2025 | 5%"));
        assert!(doc.text.starts_with("Evolução da taxa básica de juros no ano"));
    }

    #[test]
    fn test_nested_sections_are_collected_once() {
        let html = "<html><body><section><section>Texto repetido dentro de seções aninhadas</section></section></body></html>";
        let doc = extract_from_html(html, "https://example.com/");
        assert_eq!(doc.text.matches("Texto repetido").count(), 1);
        assert_eq!(doc.text, "Texto repetido dentro de seções aninhadas");
    }

    #[tokio::test]
    async fn test_fetch_sends_browser_user_agent() {
        let (base, request) = serve_once(
            "200 OK",
            "text/html; charset=utf-8",
            "<html><body><p>O dólar fechou em queda de 1,2% nesta sexta-feira.</p></body></html>",
        )
        .await;
        let url = format!("{base}/mercados/dolar");

        let doc = ArticleExtractor::new().unwrap().extract(&url).await.unwrap();

        assert_eq!(doc.text, "O dólar fechou em queda de 1,2% nesta sexta-feira.");
        assert_eq!(doc.source, url);
        let request = request.await.unwrap();
        assert!(request.starts_with("GET /mercados/dolar HTTP/1.1"));
        assert!(request.to_lowercase().contains(&format!("user-agent: {}", USER_AGENT.to_lowercase())));
    }

    #[tokio::test]
    async fn test_non_success_status_is_a_fetch_error() {
        let (base, _request) = serve_once("500 Internal Server Error", "text/html", "erro interno").await;
        let url = format!("{base}/indisponivel");

        let err = ArticleExtractor::new().unwrap().extract(&url).await.unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 500, .. }));
        assert_eq!(err.url(), url);
    }

    #[test]
    fn test_clean_text_allow_list_and_whitespace() {
        assert_eq!(clean_text("Olá,\t\tmundo!  ©®™ <b>"), "Olá, mundo! b");
        assert_eq!(clean_text("a\n\n\n\nb\n\n"), "a\n\nb");
        assert_eq!(clean_text("  linha  \n   outra "), "linha\noutra");
    }
}
