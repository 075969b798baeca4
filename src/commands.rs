//! Command registry and built-in commands.
//!
//! The registry is an ordered, immutable list built once at startup and
//! shared by every session. Lookup is a linear scan by exact name on the
//! first token; the first match wins.

use bytes::{BufMut, BytesMut};
use std::fmt::{self, Write as _};
use tracing::debug;

/// What the session should do after a command ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading input.
    Continue,
    /// Close the session.
    Exit,
}

/// Handler signature.
///
/// `args[0]` is the command name. The slice borrows from the session's
/// receive buffer and is only valid for the duration of the call.
pub type CommandFn = fn(&mut CommandContext<'_>, &[&str]) -> Flow;

/// A registered command.
#[derive(Clone, Copy)]
pub struct CommandEntry {
    pub name: &'static str,
    pub handler: CommandFn,
    pub help: &'static str,
}

impl std::fmt::Debug for CommandEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandEntry")
            .field("name", &self.name)
            .field("help", &self.help)
            .finish()
    }
}

/// State handed to a running command.
pub struct CommandContext<'a> {
    registry: &'a Registry,
    out: &'a mut BytesMut,
}

impl<'a> CommandContext<'a> {
    /// The registry the command was dispatched from.
    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// Queue raw text for the client.
    pub fn write(&mut self, text: &str) {
        self.out.put_slice(text.as_bytes());
    }

    /// Queue `text` followed by CRLF.
    pub fn write_line(&mut self, text: &str) {
        self.out.reserve(text.len() + 2);
        self.out.put_slice(text.as_bytes());
        self.out.put_slice(b"\r\n");
    }

    /// Format straight into the output, followed by CRLF.
    pub fn write_line_fmt(&mut self, args: fmt::Arguments<'_>) {
        // BytesMut grows on demand, so formatting into it cannot fail.
        let _ = self.out.write_fmt(args);
        self.out.put_slice(b"\r\n");
    }
}

/// Ordered command table.
#[derive(Debug, Clone)]
pub struct Registry {
    commands: Vec<CommandEntry>,
}

impl Registry {
    /// Build a registry from entries in lookup order.
    pub fn new(commands: Vec<CommandEntry>) -> Self {
        Self { commands }
    }

    /// The stock `help`, `echo` and `exit` commands.
    pub fn builtin() -> Self {
        Self::new(vec![
            CommandEntry {
                name: "help",
                handler: cmd_help,
                help: "show help",
            },
            CommandEntry {
                name: "echo",
                handler: cmd_echo,
                help: "echo input",
            },
            CommandEntry {
                name: "exit",
                handler: cmd_exit,
                help: "exit shell",
            },
        ])
    }

    /// Find the first entry named `name`.
    pub fn get(&self, name: &str) -> Option<&CommandEntry> {
        self.commands.iter().find(|entry| entry.name == name)
    }

    /// Iterate in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &CommandEntry> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Run the command named by `args[0]`, queueing its output in `out`.
    ///
    /// Empty input and unknown names produce no output and
    /// [`Flow::Continue`].
    pub fn dispatch(&self, args: &[&str], out: &mut BytesMut) -> Flow {
        let Some(name) = args.first() else {
            return Flow::Continue;
        };

        match self.get(name) {
            Some(entry) => {
                let mut ctx = CommandContext {
                    registry: self,
                    out,
                };
                (entry.handler)(&mut ctx, args)
            }
            None => {
                debug!(command = %name, "Unknown command ignored");
                Flow::Continue
            }
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn cmd_help(ctx: &mut CommandContext<'_>, _args: &[&str]) -> Flow {
    ctx.write("Available commands:\r\n");
    for entry in ctx.registry().iter() {
        ctx.write_line_fmt(format_args!("{} - {}", entry.name, entry.help));
    }
    Flow::Continue
}

fn cmd_echo(ctx: &mut CommandContext<'_>, args: &[&str]) -> Flow {
    for arg in args.iter().skip(1) {
        ctx.write_line(arg);
    }
    Flow::Continue
}

fn cmd_exit(_ctx: &mut CommandContext<'_>, _args: &[&str]) -> Flow {
    Flow::Exit
}
