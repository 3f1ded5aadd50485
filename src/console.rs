//! Line-oriented interactive front end.
//!
//! Each input line is one user action dispatched to the [`Session`]:
//!
//! | Input | Action |
//! |-------|--------|
//! | `/analisar` | ask for topic and directive, run the analysis |
//! | `/historico` | print the visible conversation |
//! | `/relatorio` | write the PDF report of the last answer |
//! | `/modelos` | list the supported models |
//! | `/ajuda` | list the commands |
//! | `/sair` or EOF | end the session |
//! | anything else | follow-up question |
//!
//! English aliases (`/analyze`, `/history`, `/report`, `/models`, `/help`,
//! `/quit`) are accepted too.

use crate::api::{ChatModel, SUPPORTED_MODELS};
use crate::error::ReportError;
use crate::scrapers::Extractor;
use crate::search::NewsSearch;
use crate::session::Session;
use chrono::Local;
use std::io::{self, Write};
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::{debug, error, info};

const HELP: &str = "\
Comandos:
  /analisar    pesquisar um tema e analisar as notícias encontradas
  /historico   mostrar a conversa
  /relatorio   gerar o relatório executivo em PDF da última resposta
  /modelos     listar os modelos de IA disponíveis
  /ajuda       mostrar esta ajuda
  /sair        encerrar
Qualquer outro texto continua a análise com uma nova pergunta.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Analyze,
    History,
    Report,
    Models,
    Help,
    Quit,
    Ask(String),
    Empty,
}

impl Command {
    pub fn parse(line: &str) -> Command {
        let line = line.trim();
        match line {
            "" => Command::Empty,
            "/analisar" | "/analyze" => Command::Analyze,
            "/historico" | "/history" => Command::History,
            "/relatorio" | "/report" => Command::Report,
            "/modelos" | "/models" => Command::Models,
            "/ajuda" | "/help" => Command::Help,
            "/sair" | "/quit" | "/exit" => Command::Quit,
            question => Command::Ask(question.to_string()),
        }
    }
}

/// Interactive loop over `input`, writing the transcript to `out`.
pub struct Console<R, W> {
    lines: Lines<R>,
    out: W,
    report_dir: String,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(input: R, out: W, report_dir: impl Into<String>) -> Self {
        Self {
            lines: input.lines(),
            out,
            report_dir: report_dir.into(),
        }
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Dispatch commands until `/sair` or end of input.
    pub async fn run<S, E, M>(&mut self, session: &mut Session<S, E, M>) -> io::Result<()>
    where
        S: NewsSearch,
        E: Extractor,
        M: ChatModel,
    {
        writeln!(self.out, "Monitoramento de Mercado · modelo {}", session.model_name())?;
        writeln!(self.out, "{HELP}")?;

        loop {
            write!(self.out, "\n> ")?;
            self.out.flush()?;
            let Some(line) = self.lines.next_line().await? else {
                break;
            };
            match Command::parse(&line) {
                Command::Empty => {}
                Command::Quit => break,
                Command::Help => writeln!(self.out, "{HELP}")?,
                Command::Models => self.models(session.model_name())?,
                Command::History => self.history(session)?,
                Command::Report => self.report(session).await?,
                Command::Analyze => self.analyze(session).await?,
                Command::Ask(question) => match session.follow_up(&question).await {
                    Ok(reply) => writeln!(self.out, "\n[assistente]\n{reply}")?,
                    Err(e) => writeln!(self.out, "Erro ao continuar a conversa com a API: {e}")?,
                },
            }
        }
        info!(messages = session.conversation().len(), "Session ended");
        Ok(())
    }

    async fn prompt(&mut self, label: &str) -> io::Result<Option<String>> {
        loop {
            write!(self.out, "{label}: ")?;
            self.out.flush()?;
            match self.lines.next_line().await? {
                None => return Ok(None),
                Some(line) if line.trim().is_empty() => {
                    writeln!(self.out, "O tema e a diretriz são obrigatórios.")?;
                }
                Some(line) => return Ok(Some(line.trim().to_string())),
            }
        }
    }

    async fn analyze<S, E, M>(&mut self, session: &mut Session<S, E, M>) -> io::Result<()>
    where
        S: NewsSearch,
        E: Extractor,
        M: ChatModel,
    {
        let Some(topic) = self.prompt("Tema da pesquisa no Google Notícias").await? else {
            return Ok(());
        };
        let Some(directive) = self.prompt("Diretriz de análise da IA").await? else {
            return Ok(());
        };

        let out = &mut self.out;
        let analysis = session
            .analyze(&topic, &directive, |fraction| {
                if let Err(e) = write!(out, "\rLendo notícias: {:>3.0}%", fraction * 100.0).and_then(|()| out.flush()) {
                    debug!(error = %e, "Could not write progress line");
                }
            })
            .await;

        if let Some(e) = &analysis.search_error {
            writeln!(self.out, "Erro na pesquisa de notícias: {e}")?;
        }
        if analysis.links.is_empty() {
            writeln!(self.out, "Nenhum link encontrado.")?;
            return Ok(());
        }

        writeln!(self.out)?;
        writeln!(self.out, "Links das notícias encontradas:")?;
        for link in &analysis.links {
            writeln!(self.out, "  {link}")?;
        }
        for e in &analysis.fetch_errors {
            writeln!(self.out, "Erro ao acessar ou processar o link {}: {e}", e.url())?;
        }
        writeln!(
            self.out,
            "{} de {} notícias lidas com sucesso.",
            analysis.fetched,
            analysis.links.len()
        )?;

        match analysis.reply {
            Some(Ok(reply)) => writeln!(self.out, "\n[assistente]\n{reply}")?,
            Some(Err(e)) => writeln!(self.out, "Erro ao chamar a API da OpenAI: {e}")?,
            None => {}
        }
        Ok(())
    }

    fn history<S, E, M>(&mut self, session: &Session<S, E, M>) -> io::Result<()>
    where
        S: NewsSearch,
        E: Extractor,
        M: ChatModel,
    {
        let mut any = false;
        for message in session.conversation().visible_messages() {
            any = true;
            writeln!(self.out, "\n[{}]\n{}", message.role.label(), message.content)?;
        }
        if !any {
            writeln!(self.out, "A conversa ainda está vazia.")?;
        }
        Ok(())
    }

    fn models(&mut self, active: &str) -> io::Result<()> {
        for (name, description) in SUPPORTED_MODELS {
            let marker = if *name == active { "*" } else { " " };
            writeln!(self.out, "{marker} {name}: {description}")?;
        }
        Ok(())
    }

    async fn report<S, E, M>(&mut self, session: &Session<S, E, M>) -> io::Result<()>
    where
        S: NewsSearch,
        E: Extractor,
        M: ChatModel,
    {
        let rendered = match session.report(Local::now()) {
            Ok(rendered) => rendered,
            Err(ReportError::NothingToReport) => {
                writeln!(self.out, "Ainda não há uma análise para gerar o relatório.")?;
                return Ok(());
            }
            Err(e) => {
                error!(error = %e, "Report rendering failed");
                writeln!(self.out, "Erro ao gerar o relatório: {e}")?;
                return Ok(());
            }
        };

        let path = Path::new(&self.report_dir).join(&rendered.filename);
        match tokio::fs::write(&path, &rendered.bytes).await {
            Ok(()) => {
                info!(path = %path.display(), bytes = rendered.bytes.len(), "Wrote executive report");
                writeln!(self.out, "Relatório salvo em {}", path.display())?;
            }
            Err(source) => {
                let e = ReportError::Write {
                    path: path.display().to_string(),
                    source,
                };
                error!(error = %e, "Failed writing report");
                writeln!(self.out, "Erro ao salvar o relatório: {e}")?;
            }
        }
        Ok(())
    }
}
