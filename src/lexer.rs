use crate::error::ParseError;

/// One top-level command line, carrying the raw text of the `{ ... }` block
/// that follows it, if any. Block text is not parsed here.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCommand {
    pub text: String,
    pub line: usize,
    pub next_line: usize,
    pub block: Option<RawBlock>,
}

/// Literal text between a matched `{` and `}`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBlock {
    pub text: String,
    /// Line of the opening brace; the block text starts on it.
    pub line: usize,
}

/// Split a text region into its top-level command lines.
///
/// `first_line` is the 1-indexed line the region starts on, so nested blocks
/// keep reporting positions in the source file.
///
/// Braces inside double-quoted strings, braces escaped with `\`, and braces
/// inside `#` comment lines do not change the nesting depth. A block attaches
/// to the command on the line it opens, or to the most recent command when
/// the `{` stands alone.
pub fn split_commands(source: &str, first_line: usize) -> Result<Vec<RawCommand>, ParseError> {
    let mut s = Splitter {
        commands: Vec::new(),
        pending: String::new(),
        pending_line: None,
        owner: None,
        block: String::new(),
        block_line: 0,
        depth: 0,
        line: first_line,
    };

    let mut in_quote = false;
    let mut at_line_start = true;
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' {
            s.push(c);
            if let Some(escaped) = chars.next() {
                s.push(escaped);
                if escaped == '\n' {
                    s.line += 1;
                }
            }
            at_line_start = false;
            continue;
        }

        if in_quote {
            match c {
                '\n' => return Err(ParseError::UnterminatedString { line: s.line }),
                '"' => in_quote = false,
                _ => {}
            }
            s.push(c);
            continue;
        }

        if at_line_start && c == '#' {
            while chars.peek().is_some_and(|&next| next != '\n') {
                chars.next();
            }
            continue;
        }

        match c {
            '"' => {
                in_quote = true;
                at_line_start = false;
                s.push(c);
            }
            '{' => {
                s.open_brace()?;
                at_line_start = false;
            }
            '}' => {
                s.close_brace()?;
                at_line_start = false;
            }
            '\n' => {
                if s.depth == 0 {
                    s.flush_pending(s.line + 1);
                } else {
                    s.block.push('\n');
                }
                s.line += 1;
                at_line_start = true;
            }
            _ => {
                if !c.is_whitespace() {
                    at_line_start = false;
                }
                s.push(c);
            }
        }
    }

    if in_quote {
        return Err(ParseError::UnterminatedString { line: s.line });
    }
    if s.depth > 0 {
        return Err(ParseError::UnclosedBlock { line: s.block_line });
    }
    s.flush_pending(s.line + 1);
    Ok(s.commands)
}

struct Splitter {
    commands: Vec<RawCommand>,
    pending: String,
    pending_line: Option<usize>,
    /// Index in `commands` of the command owning the open block.
    owner: Option<usize>,
    block: String,
    block_line: usize,
    depth: usize,
    line: usize,
}

impl Splitter {
    fn push(&mut self, c: char) {
        if self.depth > 0 {
            self.block.push(c);
            return;
        }
        if self.pending_line.is_none() && !c.is_whitespace() {
            self.pending_line = Some(self.line);
        }
        self.pending.push(c);
    }

    fn flush_pending(&mut self, next_line: usize) {
        let text = self.pending.trim();
        if let Some(line) = self.pending_line.take() {
            self.commands.push(RawCommand {
                text: text.to_string(),
                line,
                next_line,
                block: None,
            });
        }
        self.pending.clear();
    }

    fn open_brace(&mut self) -> Result<(), ParseError> {
        if self.depth > 0 {
            self.depth += 1;
            self.block.push('{');
            return Ok(());
        }

        self.flush_pending(self.line + 1);
        match self.commands.last() {
            Some(last) if last.block.is_none() => {
                self.owner = Some(self.commands.len() - 1);
            }
            _ => return Err(ParseError::OrphanBlock { line: self.line }),
        }
        self.depth = 1;
        self.block_line = self.line;
        self.block.clear();
        Ok(())
    }

    fn close_brace(&mut self) -> Result<(), ParseError> {
        match self.depth {
            0 => Err(ParseError::UnbalancedBrace { line: self.line }),
            1 => {
                self.depth = 0;
                let block = RawBlock {
                    text: std::mem::take(&mut self.block),
                    line: self.block_line,
                };
                if let Some(owner) = self.owner.take() {
                    let command = &mut self.commands[owner];
                    command.block = Some(block);
                    command.next_line = self.line + 1;
                }
                Ok(())
            }
            _ => {
                self.depth -= 1;
                self.block.push('}');
                Ok(())
            }
        }
    }
}

/// Split one command line into whitespace-separated tokens.
///
/// Double-quoted segments stay inside a single token together with their
/// quotes, and a backslash keeps the following character in the token
/// verbatim. Literal coercion happens later, per token.
pub fn tokenize_line(text: &str, line: usize) -> Result<Vec<String>, ParseError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                current.push(c);
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            '"' => {
                in_quote = !in_quote;
                current.push(c);
            }
            c if c.is_whitespace() && !in_quote => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }

    if in_quote {
        return Err(ParseError::UnterminatedString { line });
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}
