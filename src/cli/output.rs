//! Colored terminal output.

use std::io::Write;
use termcolor::{Buffer, BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

/// Writes status lines to stdout, and errors to stderr
#[derive(Debug)]
pub struct OutputManager {
    stdout: BufferWriter,
    quiet: bool,
}

impl Clone for OutputManager {
    fn clone(&self) -> Self {
        Self::new(self.quiet)
    }
}

impl OutputManager {
    /// Create an output manager; `quiet` silences everything but errors
    pub fn new(quiet: bool) -> Self {
        Self {
            stdout: BufferWriter::stdout(ColorChoice::Auto),
            quiet,
        }
    }

    /// Whether informational output is suppressed
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    fn tagged(&self, marker: &str, color: Color, bold: bool, message: &str) -> std::io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let mut buffer = self.stdout.buffer();
        write_tagged(&mut buffer, marker, color, bold, message)?;
        self.stdout.print(&buffer)
    }

    /// Informational line
    pub fn info(&self, message: &str) -> std::io::Result<()> {
        self.tagged("ℹ", Color::Cyan, false, message)
    }

    /// Something was recorded
    pub fn success(&self, message: &str) -> std::io::Result<()> {
        self.tagged("✓", Color::Green, true, message)
    }

    /// Non-fatal problem
    pub fn warn(&self, message: &str) -> std::io::Result<()> {
        self.tagged("⚠", Color::Yellow, true, message)
    }

    /// Error line on stderr, shown even when quiet
    pub fn error(&self, message: &str) {
        let stderr = BufferWriter::stderr(ColorChoice::Auto);
        let mut buffer = stderr.buffer();
        if write_tagged(&mut buffer, "✗", Color::Red, true, message).is_err()
            || stderr.print(&buffer).is_err()
        {
            eprintln!("✗ {}", message);
        }
    }

    /// Section header
    pub fn section(&self, title: &str) -> std::io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let mut buffer = self.stdout.buffer();
        writeln!(&mut buffer)?;
        buffer.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
        writeln!(&mut buffer, "═══ {} ═══", title)?;
        buffer.reset()?;
        self.stdout.print(&buffer)
    }

    /// Indented sub-item
    pub fn indent(&self, message: &str) -> std::io::Result<()> {
        self.println(&format!("    {}", message))
    }

    /// Plain line
    pub fn println(&self, message: &str) -> std::io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let mut buffer = self.stdout.buffer();
        writeln!(&mut buffer, "{}", message)?;
        self.stdout.print(&buffer)
    }

    /// Command for the operator to act on; printed even when quiet
    pub fn command(&self, header: &str, command: &str) -> std::io::Result<()> {
        let mut buffer = self.stdout.buffer();
        writeln!(&mut buffer, "\n{}\n", header)?;
        buffer.set_color(ColorSpec::new().set_bold(true))?;
        write!(&mut buffer, "    {}", command)?;
        buffer.reset()?;
        writeln!(&mut buffer, "\n")?;
        self.stdout.print(&buffer)
    }

    /// Question left open on the current line; printed even when quiet
    pub fn prompt(&self, question: &str) -> std::io::Result<()> {
        let mut buffer = self.stdout.buffer();
        write!(&mut buffer, "{} ", question)?;
        self.stdout.print(&buffer)?;
        std::io::stdout().flush()
    }

    /// Machine-readable output; printed even when quiet
    pub fn data(&self, payload: &str) -> std::io::Result<()> {
        let mut buffer = self.stdout.buffer();
        writeln!(&mut buffer, "{}", payload)?;
        self.stdout.print(&buffer)
    }
}

fn write_tagged(buffer: &mut Buffer, marker: &str, color: Color, bold: bool, message: &str) -> std::io::Result<()> {
    buffer.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(bold))?;
    write!(buffer, "{}", marker)?;
    buffer.reset()?;
    writeln!(buffer, " {}", message)
}
