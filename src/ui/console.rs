// # Console
//
// Line-oriented front-end over `AppController`. One `select!` loop reads
// stdin and worker events; the current input mode decides what a line means:
//
//   Command   → `scan`, `start`, `rename`, ...
//   Selecting → candidate number, `q <query>`, or `c`
//   Manual    → one metadata field per line
//
// Prompts that arrive mid-form wait in a queue until the form is done.

use crate::album::ManualEntry;
use crate::library::{FolderEntry, RenameOutcome};
use crate::matcher::{SelectionPrompt, WorkflowEvent};
use crate::ui::controller::{AppController, Notice};
use std::collections::VecDeque;
use std::io::{self, Write};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

const HELP: &str = "\
Commands:
  scan <dir>       scan the album folders under <dir>
  list             show folders and their status
  start            match every pending folder
  search <n>       search folder <n> again
  manual <n>       enter metadata for folder <n> by hand
  rename <n>       rename folder <n> to its suggested name
  rename-all       rename every matched folder
  export [file]    write matched folders to a spreadsheet
  open <n>         show folder <n> in the file manager
  details <n>      show the metadata of folder <n>
  help             show this help
  quit             exit";

const MANUAL_FIELDS: [&str; 9] = [
    "Artist",
    "Album",
    "Year",
    "Label",
    "Catalog number",
    "Genre",
    "Style",
    "Country",
    "Notes",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

struct ManualForm {
    index: usize,
    field: usize,
    entry: ManualEntry,
}

impl ManualForm {
    fn set_current(&mut self, value: &str) {
        let value = value.trim().to_string();
        let slot = match self.field {
            0 => &mut self.entry.artist,
            1 => &mut self.entry.album,
            2 => &mut self.entry.year,
            3 => &mut self.entry.label,
            4 => &mut self.entry.catalog_number,
            5 => &mut self.entry.genre,
            6 => &mut self.entry.style,
            7 => &mut self.entry.country,
            _ => &mut self.entry.notes,
        };
        *slot = value;
        self.field += 1;
    }

    fn is_complete(&self) -> bool {
        self.field >= MANUAL_FIELDS.len()
    }
}

enum Mode {
    Command,
    Selecting(SelectionPrompt),
    Manual(ManualForm),
}

pub struct Console<W: Write> {
    controller: AppController,
    mode: Mode,
    queued_prompts: VecDeque<SelectionPrompt>,
    out: W,
}

/// Parse a 1-based number as shown by `list` into a registry index
fn parse_index(arg: &str) -> Option<usize> {
    arg.trim().parse::<usize>().ok()?.checked_sub(1)
}

impl<W: Write> Console<W> {
    pub fn new(controller: AppController, out: W) -> Self {
        Self {
            controller,
            mode: Mode::Command,
            queued_prompts: VecDeque::new(),
            out,
        }
    }

    pub fn controller(&self) -> &AppController {
        &self.controller
    }

    pub fn is_selecting(&self) -> bool {
        matches!(self.mode, Mode::Selecting(_))
    }

    pub fn is_in_form(&self) -> bool {
        matches!(self.mode, Mode::Manual(_))
    }

    pub fn into_output(self) -> W {
        self.out
    }

    pub fn print_help(&mut self) -> io::Result<()> {
        writeln!(self.out, "{}", HELP)
    }

    /// Handle one line of user input
    pub fn handle_line(&mut self, line: &str) -> io::Result<Flow> {
        match std::mem::replace(&mut self.mode, Mode::Command) {
            Mode::Command => return self.handle_command(line.trim()),
            Mode::Selecting(prompt) => self.handle_selection(prompt, line.trim())?,
            Mode::Manual(form) => self.handle_form_field(form, line)?,
        }
        Ok(Flow::Continue)
    }

    pub fn handle_event(&mut self, event: WorkflowEvent) -> io::Result<()> {
        match self.controller.handle_event(event) {
            Some(Notice::Status(status)) => {
                self.drop_abandoned_prompt()?;
                writeln!(self.out, "{}", status)
            }
            Some(Notice::Prompt(prompt)) => {
                self.drop_abandoned_prompt()?;
                match self.mode {
                    Mode::Command => self.show_prompt(prompt),
                    _ => {
                        debug!("Queueing prompt for {}", prompt.folder_name);
                        self.queued_prompts.push_back(prompt);
                        Ok(())
                    }
                }
            }
            None => Ok(()),
        }
    }

    /// A prompt whose worker timed out is no longer answerable
    fn drop_abandoned_prompt(&mut self) -> io::Result<()> {
        if let Mode::Selecting(prompt) = &self.mode {
            if prompt.responder.is_abandoned() {
                writeln!(self.out, "Selection for {} timed out", prompt.folder_name)?;
                self.mode = Mode::Command;
            }
        }
        self.queued_prompts
            .retain(|prompt| !prompt.responder.is_abandoned());
        Ok(())
    }

    fn show_prompt(&mut self, prompt: SelectionPrompt) -> io::Result<()> {
        if prompt.candidates.is_empty() {
            writeln!(
                self.out,
                "No results for \"{}\" ({}). Enter q <query> to search again, or c to cancel",
                prompt.query, prompt.folder_name
            )?;
        } else {
            writeln!(
                self.out,
                "Select a release for {} (query \"{}\"):",
                prompt.folder_name, prompt.query
            )?;
            for (i, candidate) in prompt.candidates.iter().enumerate() {
                writeln!(self.out, "  {}. {}", i + 1, candidate.display_line())?;
            }
            writeln!(self.out, "Enter a number, q <query> to search again, or c to cancel")?;
        }
        self.mode = Mode::Selecting(prompt);
        Ok(())
    }

    fn show_next_prompt(&mut self) -> io::Result<()> {
        self.queued_prompts
            .retain(|prompt| !prompt.responder.is_abandoned());
        match self.queued_prompts.pop_front() {
            Some(prompt) => self.show_prompt(prompt),
            None => Ok(()),
        }
    }

    fn handle_selection(&mut self, prompt: SelectionPrompt, input: &str) -> io::Result<()> {
        if prompt.responder.is_abandoned() {
            writeln!(self.out, "Selection for {} timed out", prompt.folder_name)?;
            return self.show_next_prompt();
        }

        if input.eq_ignore_ascii_case("c") {
            prompt.responder.cancel();
            return Ok(());
        }

        if let Some(query) = input.strip_prefix("q ") {
            let query = query.trim();
            if !query.is_empty() {
                writeln!(self.out, "Searching \"{}\"", query)?;
                prompt.responder.requery(query);
                return Ok(());
            }
        }

        let choice = parse_index(input).filter(|i| *i < prompt.candidates.len());
        match choice {
            Some(i) => {
                let SelectionPrompt {
                    mut candidates,
                    responder,
                    ..
                } = prompt;
                responder.choose(candidates.swap_remove(i));
            }
            None => {
                writeln!(self.out, "Enter 1-{}, q <query>, or c", prompt.candidates.len())?;
                self.mode = Mode::Selecting(prompt);
            }
        }
        Ok(())
    }

    fn handle_form_field(&mut self, mut form: ManualForm, line: &str) -> io::Result<()> {
        form.set_current(line);
        if !form.is_complete() {
            write!(self.out, "{}: ", MANUAL_FIELDS[form.field])?;
            self.out.flush()?;
            self.mode = Mode::Manual(form);
            return Ok(());
        }

        match self.controller.manual(form.index, form.entry) {
            Ok(()) => {
                let name = self
                    .controller
                    .registry()
                    .get(form.index)
                    .and_then(FolderEntry::suggested_name)
                    .unwrap_or_default();
                writeln!(self.out, "Saved. Suggested name: {}", name)?;
            }
            Err(e) => writeln!(self.out, "Error: {}", e)?,
        }
        self.show_next_prompt()
    }

    fn handle_command(&mut self, line: &str) -> io::Result<Flow> {
        if line.is_empty() {
            return Ok(Flow::Continue);
        }

        let (command, arg) = match line.split_once(char::is_whitespace) {
            Some((command, arg)) => (command, arg.trim()),
            None => (line, ""),
        };

        match command {
            "quit" | "exit" => return Ok(Flow::Quit),
            "help" => self.print_help()?,
            "list" => self.list()?,
            "scan" => self.scan(arg)?,
            "start" => match self.controller.start_batch() {
                Ok(total) => writeln!(self.out, "Queued {} folder(s)", total)?,
                Err(e) => writeln!(self.out, "Error: {}", e)?,
            },
            "export" => {
                let path = (!arg.is_empty()).then(|| Path::new(arg));
                match self.controller.export(path) {
                    Ok((rows, path)) => writeln!(
                        self.out,
                        "Exported {} album(s) to {}",
                        rows,
                        path.display()
                    )?,
                    Err(e) => writeln!(self.out, "Error: {}", e)?,
                }
            }
            "rename-all" => {
                let report = self.controller.rename_all();
                writeln!(
                    self.out,
                    "Renamed {}, skipped {}, failed {}",
                    report.renamed, report.skipped, report.failed
                )?;
                for error in &report.errors {
                    writeln!(self.out, "  {}", error)?;
                }
            }
            "search" | "manual" | "rename" | "open" | "details" => {
                let Some(index) = parse_index(arg) else {
                    writeln!(self.out, "Usage: {} <n>", command)?;
                    return Ok(Flow::Continue);
                };
                self.entry_command(command, index)?;
            }
            _ => writeln!(self.out, "Unknown command '{}', try help", command)?,
        }

        Ok(Flow::Continue)
    }

    fn entry_command(&mut self, command: &str, index: usize) -> io::Result<()> {
        let result = match command {
            "search" => self
                .controller
                .research(index)
                .map(|()| "Queued for search".to_string()),
            "rename" => self.controller.rename(index).map(|outcome| match outcome {
                RenameOutcome::Renamed { from_name, to_name } => {
                    format!("Renamed {} → {}", from_name, to_name)
                }
                RenameOutcome::Unchanged => "Already named".to_string(),
            }),
            "open" => self
                .controller
                .open_folder(index)
                .map(|()| "Opened".to_string()),
            "details" => self
                .controller
                .details(index)
                .map(|details| details.unwrap_or_else(|| "No metadata yet".to_string())),
            _ => return self.begin_form(index),
        };

        match result {
            Ok(message) => writeln!(self.out, "{}", message),
            Err(e) => writeln!(self.out, "Error: {}", e),
        }
    }

    fn begin_form(&mut self, index: usize) -> io::Result<()> {
        let Some(entry) = self.controller.registry().get(index) else {
            return writeln!(self.out, "No folder {}", index + 1);
        };

        writeln!(
            self.out,
            "Manual metadata for {} (blank lines leave a field empty)",
            entry.name()
        )?;
        write!(self.out, "{}: ", MANUAL_FIELDS[0])?;
        self.out.flush()?;
        self.mode = Mode::Manual(ManualForm {
            index,
            field: 0,
            entry: ManualEntry::default(),
        });
        Ok(())
    }

    fn scan(&mut self, arg: &str) -> io::Result<()> {
        if arg.is_empty() {
            return writeln!(self.out, "Usage: scan <dir>");
        }
        match self.controller.scan(Path::new(arg)) {
            Ok(count) => {
                writeln!(self.out, "Found {} folder(s)", count)?;
                self.list()
            }
            Err(e) => writeln!(self.out, "Error: {}", e),
        }
    }

    fn list(&mut self) -> io::Result<()> {
        let registry = self.controller.registry();
        if registry.is_empty() {
            return writeln!(self.out, "No folders");
        }

        for (i, entry) in registry.entries().iter().enumerate() {
            write!(
                self.out,
                "{:>3}. [{:<9}] {}",
                i + 1,
                entry.status().label(),
                entry.name()
            )?;
            match entry.suggested_name() {
                Some(suggested) if suggested != entry.name() => {
                    writeln!(self.out, "  → {}", suggested)?
                }
                _ => writeln!(self.out)?,
            }
        }
        Ok(())
    }
}

/// Run the console on stdin/stdout until `quit` or end of input
pub async fn run(
    controller: AppController,
    mut events: UnboundedReceiver<WorkflowEvent>,
) -> io::Result<()> {
    let mut console = Console::new(controller, io::stdout());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if let Some(root) = console.controller().registry().root() {
        info!("Console started on {}", root.display());
    }
    console.print_help()?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if console.handle_line(&line)? == Flow::Quit {
                    break;
                }
            }
            Some(event) = events.recv() => {
                console.handle_event(event)?;
            }
        }
    }

    info!("Console exiting");
    Ok(())
}
