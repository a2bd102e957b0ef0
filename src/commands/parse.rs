//! Turns command strings into [`Command`] records.
//!
//! Commands are separated by `;`, operations within a command by `,`.
//! Both separators are quote-aware, and a command may be prefixed by a
//! `[key="value" …]` criteria set.

use std::fmt;

use regex::Regex;
use uuid::Uuid;

use super::{
    Command, Criterion, FocusTarget, LayoutArg, Match, MoveTarget, Op, ToggleArg,
    WorkspaceTarget,
};
use crate::layout::{Direction, KillPolicy, Orientation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    fn new(message: impl Into<String>) -> ParseError {
        ParseError { message: message.into() }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Parses a full command string. Each `;`-separated command parses
/// independently so one bad command does not stop the rest.
pub fn parse(input: &str) -> Vec<Result<Command, ParseError>> {
    split_level(input, ';')
        .into_iter()
        .filter(|chunk| !chunk.trim().is_empty())
        .map(|chunk| parse_command(chunk.trim()))
        .collect()
}

fn parse_command(input: &str) -> Result<Command, ParseError> {
    let (criteria, rest) = parse_criteria(input)?;
    let mut ops = Vec::new();
    for phrase in split_level(rest, ',') {
        let phrase = phrase.trim();
        if phrase.is_empty() {
            continue;
        }
        ops.push(parse_op(phrase)?);
    }
    if ops.is_empty() {
        return Err(ParseError::new("empty command"));
    }
    Ok(Command { criteria, ops })
}

/// Splits on a separator, ignoring separators inside double quotes and
/// criteria brackets.
fn split_level(input: &str, separator: char) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut in_brackets = false;
    for c in input.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            '[' if !in_quotes => {
                in_brackets = true;
                current.push(c);
            }
            ']' if !in_quotes => {
                in_brackets = false;
                current.push(c);
            }
            c if c == separator && !in_quotes && !in_brackets => {
                result.push(std::mem::take(&mut current));
            }
            c => current.push(c),
        }
    }
    result.push(current);
    result
}

/// Extracts a leading `[…]` criteria set, returning it and the rest.
/// Also used by the config reader for `assign` and `for_window`.
pub(crate) fn parse_criteria(input: &str) -> Result<(Match, &str), ParseError> {
    let input = input.trim_start();
    if !input.starts_with('[') {
        return Ok((Match::default(), input));
    }
    let end = input
        .find(']')
        .ok_or_else(|| ParseError::new("unterminated criteria"))?;
    let inner = &input[1..end];
    let rest = &input[end + 1..];
    let mut criteria = Vec::new();
    for token in tokenize(inner) {
        let criterion = match token.split_once('=') {
            Some((key, value)) => {
                let value = value.trim_matches('"');
                match key {
                    "class" => Criterion::Class(compile_regex(value)?),
                    "instance" => Criterion::Instance(compile_regex(value)?),
                    "title" => Criterion::Title(compile_regex(value)?),
                    "con_mark" => Criterion::Mark(value.to_string()),
                    "con_id" => Criterion::ConId(
                        Uuid::parse_str(value)
                            .map_err(|_| ParseError::new(format!("bad con_id: {}", value)))?,
                    ),
                    "id" => Criterion::Id(parse_window_id(value)?),
                    "window_type" => Criterion::WindowType(value.to_string()),
                    other => {
                        return Err(ParseError::new(format!("unknown criterion: {}", other)))
                    }
                }
            }
            None => match token.as_str() {
                "floating" => Criterion::Floating,
                "tiling" => Criterion::Tiling,
                "urgent" => Criterion::Urgent,
                other => return Err(ParseError::new(format!("unknown criterion: {}", other))),
            },
        };
        criteria.push(criterion);
    }
    Ok((Match { criteria }, rest))
}

fn compile_regex(value: &str) -> Result<Regex, ParseError> {
    Regex::new(value).map_err(|err| ParseError::new(format!("bad pattern: {}", err)))
}

fn parse_window_id(value: &str) -> Result<u32, ParseError> {
    let parsed = if let Some(hex) = value.strip_prefix("0x") {
        u32::from_str_radix(hex, 16)
    } else {
        value.parse()
    };
    parsed.map_err(|_| ParseError::new(format!("bad window id: {}", value)))
}

/// Whitespace tokenizer with double-quote support. Tabs count as
/// whitespace, quotes group words, the quotes themselves are dropped.
fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in input.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn parse_direction(token: &str) -> Result<Direction, ParseError> {
    match token {
        "left" => Ok(Direction::Left),
        "right" => Ok(Direction::Right),
        "up" => Ok(Direction::Up),
        "down" => Ok(Direction::Down),
        other => Err(ParseError::new(format!("expected a direction, got {}", other))),
    }
}

fn parse_op(phrase: &str) -> Result<Op, ParseError> {
    // `exec` takes its argument verbatim, quoting included.
    if let Some(rest) = phrase.strip_prefix("exec ") {
        return Ok(Op::Exec(rest.trim().to_string()));
    }
    let tokens = tokenize(phrase);
    let words: Vec<&str> = tokens.iter().map(|t| t.as_str()).collect();
    match words.split_first() {
        Some((&"focus", args)) => parse_focus(args),
        Some((&"move", args)) => parse_move(args),
        Some((&"resize", args)) => parse_resize(args),
        Some((&"split", args)) => match args {
            [o] if *o == "h" || *o == "horizontal" => Ok(Op::Split(Orientation::Horizontal)),
            [o] if *o == "v" || *o == "vertical" => Ok(Op::Split(Orientation::Vertical)),
            _ => Err(ParseError::new("split expects h or v")),
        },
        Some((&"layout", args)) => match args {
            [] | ["default"] => Ok(Op::Layout(LayoutArg::Default)),
            [o] if *o == "stacked" || *o == "stacking" => Ok(Op::Layout(LayoutArg::Stacked)),
            ["tabbed"] => Ok(Op::Layout(LayoutArg::Tabbed)),
            ["toggle"] => Ok(Op::Layout(LayoutArg::Toggle)),
            _ => Err(ParseError::new("unknown layout")),
        },
        Some((&"floating", args)) => parse_toggle(args).map(Op::Floating),
        Some((&"fullscreen", args)) => {
            let (args, global) = match args.split_last() {
                Some((&"global", rest)) => (rest, true),
                _ => (args, false),
            };
            let arg = if args.is_empty() {
                ToggleArg::Toggle
            } else {
                parse_toggle(args)?
            };
            Ok(Op::Fullscreen { arg, global })
        }
        Some((&"kill", args)) => match args {
            [] | ["window"] => Ok(Op::Kill(KillPolicy::Window)),
            ["client"] => Ok(Op::Kill(KillPolicy::Client)),
            _ => Err(ParseError::new("kill expects window or client")),
        },
        Some((&"mark", args)) => match args {
            [name] => Ok(Op::Mark(name.to_string())),
            _ => Err(ParseError::new("mark expects exactly one name")),
        },
        Some((&"unmark", args)) => match args {
            [] => Ok(Op::Unmark(None)),
            [name] => Ok(Op::Unmark(Some(name.to_string()))),
            _ => Err(ParseError::new("unmark expects at most one name")),
        },
        Some((&"workspace", args)) => parse_workspace(args),
        Some((&"scratchpad", ["show"])) => Ok(Op::ScratchpadShow),
        Some((&"sticky", args)) => parse_toggle(args).map(|arg| Op::Sticky(arg, None)),
        Some((&"exec", _)) => Ok(Op::Exec(String::new())),
        Some((&"nop", args)) => Ok(Op::Nop(if args.is_empty() {
            None
        } else {
            Some(args.join(" "))
        })),
        Some((&"restart", [])) => Ok(Op::Restart),
        Some((&"reload", [])) => Ok(Op::Reload),
        Some((&"exit", [])) => Ok(Op::Exit),
        _ => Err(ParseError::new(format!("unknown command: {}", phrase))),
    }
}

fn parse_toggle(args: &[&str]) -> Result<ToggleArg, ParseError> {
    match args {
        ["enable"] => Ok(ToggleArg::Enable),
        ["disable"] => Ok(ToggleArg::Disable),
        ["toggle"] => Ok(ToggleArg::Toggle),
        _ => Err(ParseError::new("expected enable, disable, or toggle")),
    }
}

fn parse_focus(args: &[&str]) -> Result<Op, ParseError> {
    match args {
        ["parent"] => Ok(Op::Focus(FocusTarget::Parent)),
        ["child"] => Ok(Op::Focus(FocusTarget::Child)),
        ["floating"] => Ok(Op::Focus(FocusTarget::Floating)),
        ["tiling"] => Ok(Op::Focus(FocusTarget::Tiling)),
        ["mode_toggle"] => Ok(Op::Focus(FocusTarget::ModeToggle)),
        [dir] => Ok(Op::Focus(FocusTarget::Direction(parse_direction(dir)?))),
        _ => Err(ParseError::new("focus expects one argument")),
    }
}

fn parse_move(args: &[&str]) -> Result<Op, ParseError> {
    // The optional `container` noun is accepted and dropped.
    let args = match args.split_first() {
        Some((&"container", rest)) => rest,
        _ => args,
    };
    match args {
        ["scratchpad"] => Ok(Op::Move(MoveTarget::Scratchpad)),
        ["workspace", "next"] => Ok(Op::Move(MoveTarget::WorkspaceNext)),
        ["workspace", "prev"] => Ok(Op::Move(MoveTarget::WorkspacePrev)),
        ["workspace", "to", "output", name @ ..] if !name.is_empty() => {
            Ok(Op::Move(MoveTarget::WorkspaceToOutput(name.join(" "))))
        }
        ["to", "workspace", "current"] => Ok(Op::Move(MoveTarget::ToWorkspaceCurrent)),
        ["to", "workspace", "number", number] => number
            .parse()
            .map(MoveTarget::ToWorkspaceNumber)
            .map(Op::Move)
            .map_err(|_| ParseError::new(format!("bad workspace number: {}", number))),
        ["to", "workspace", name @ ..] if !name.is_empty() => {
            Ok(Op::Move(MoveTarget::ToWorkspace(name.join(" "))))
        }
        ["to", "output", name @ ..] if !name.is_empty() => {
            Ok(Op::Move(MoveTarget::ToOutput(name.join(" "))))
        }
        [dir] => Ok(Op::Move(MoveTarget::Direction(parse_direction(dir)?))),
        _ => Err(ParseError::new("unknown move target")),
    }
}

fn parse_resize(args: &[&str]) -> Result<Op, ParseError> {
    let (grow, args) = match args.split_first() {
        Some((&"grow", rest)) => (true, rest),
        Some((&"shrink", rest)) => (false, rest),
        _ => return Err(ParseError::new("resize expects grow or shrink")),
    };
    let (direction, args) = match args.split_first() {
        Some((&"width", rest)) => (Direction::Right, rest),
        Some((&"height", rest)) => (Direction::Down, rest),
        Some((dir, rest)) => (parse_direction(dir)?, rest),
        None => return Err(ParseError::new("resize expects a direction")),
    };
    // `<N> px`, `<M> ppt`, or `<N> px or <M> ppt`.
    let mut px = 0;
    let mut ppt = 0;
    let mut iter = args.iter().peekable();
    while let Some(token) = iter.next() {
        if *token == "or" {
            continue;
        }
        let amount: u32 = token
            .parse()
            .map_err(|_| ParseError::new(format!("bad resize amount: {}", token)))?;
        match iter.next() {
            Some(&"px") => px = amount,
            Some(&"ppt") => ppt = amount,
            // A bare number means pixels.
            None => px = amount,
            Some(other) => {
                return Err(ParseError::new(format!("expected px or ppt, got {}", other)))
            }
        }
    }
    if px == 0 && ppt == 0 {
        ppt = 10;
    }
    Ok(Op::Resize { grow, direction, px, ppt })
}

fn parse_workspace(args: &[&str]) -> Result<Op, ParseError> {
    match args {
        ["back_and_forth"] => Ok(Op::Workspace(WorkspaceTarget::BackAndForth)),
        ["next"] => Ok(Op::Workspace(WorkspaceTarget::Next)),
        ["prev"] => Ok(Op::Workspace(WorkspaceTarget::Prev)),
        ["next_on_output"] => Ok(Op::Workspace(WorkspaceTarget::NextOnOutput)),
        ["prev_on_output"] => Ok(Op::Workspace(WorkspaceTarget::PrevOnOutput)),
        ["number", number] => number
            .parse()
            .map(WorkspaceTarget::Number)
            .map(Op::Workspace)
            .map_err(|_| ParseError::new(format!("bad workspace number: {}", number))),
        name if !name.is_empty() => Ok(Op::Workspace(WorkspaceTarget::Name(name.join(" ")))),
        _ => Err(ParseError::new("workspace expects a name")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one(input: &str) -> Command {
        let mut parsed = parse(input);
        assert_eq!(parsed.len(), 1, "expected one command from {:?}", input);
        parsed.remove(0).expect("command did not parse")
    }

    #[test]
    fn kill_sequences_with_odd_whitespace() {
        for input in ["kill ; kill", "kill;kill", "kill\t;\tkill", "  kill  ;  kill  "] {
            let parsed = parse(input);
            assert_eq!(parsed.len(), 2, "on {:?}", input);
            for command in parsed {
                let command = command.expect("kill did not parse");
                assert_eq!(command.ops, vec![Op::Kill(crate::layout::KillPolicy::Window)]);
            }
        }
    }

    #[test]
    fn comma_chains_operations() {
        let command = one("floating enable, move to workspace 5");
        assert_eq!(command.ops.len(), 2);
        assert_eq!(command.ops[0], Op::Floating(ToggleArg::Enable));
        assert_eq!(
            command.ops[1],
            Op::Move(MoveTarget::ToWorkspace("5".into()))
        );
    }

    #[test]
    fn criteria_prefix() {
        let command = one(r#"[class="^Firefox$" title="bug tracker"] kill"#);
        assert_eq!(command.criteria.criteria.len(), 2);
        match &command.criteria.criteria[0] {
            Criterion::Class(re) => assert!(re.is_match("Firefox")),
            other => panic!("expected class criterion, got {:?}", other),
        }
    }

    #[test]
    fn semicolons_inside_quotes_are_literal() {
        let parsed = parse(r#"exec notify-send "a;b" ; nop"#);
        assert_eq!(parsed.len(), 2);
        match parsed[0].as_ref().unwrap().ops.first().unwrap() {
            Op::Exec(arg) => assert_eq!(arg, r#"notify-send "a;b""#),
            other => panic!("expected exec, got {:?}", other),
        }
    }

    #[test]
    fn resize_grammar() {
        let command = one("resize grow up 10 px or 25 ppt");
        assert_eq!(
            command.ops[0],
            Op::Resize { grow: true, direction: Direction::Up, px: 10, ppt: 25 }
        );
        let command = one("resize shrink width 5 px");
        assert_eq!(
            command.ops[0],
            Op::Resize { grow: false, direction: Direction::Right, px: 5, ppt: 0 }
        );
    }

    #[test]
    fn move_grammar() {
        assert_eq!(
            one("move workspace to output fake-1").ops[0],
            Op::Move(MoveTarget::WorkspaceToOutput("fake-1".into()))
        );
        assert_eq!(
            one("move container to workspace number 5").ops[0],
            Op::Move(MoveTarget::ToWorkspaceNumber(5))
        );
        assert_eq!(one("move left").ops[0], Op::Move(MoveTarget::Direction(Direction::Left)));
        assert_eq!(one("move scratchpad").ops[0], Op::Move(MoveTarget::Scratchpad));
    }

    #[test]
    fn workspace_grammar() {
        assert_eq!(
            one("workspace back_and_forth").ops[0],
            Op::Workspace(WorkspaceTarget::BackAndForth)
        );
        assert_eq!(
            one("workspace web mail").ops[0],
            Op::Workspace(WorkspaceTarget::Name("web mail".into()))
        );
        assert_eq!(
            one("workspace number 3").ops[0],
            Op::Workspace(WorkspaceTarget::Number(3))
        );
    }

    #[test]
    fn bad_commands_do_not_poison_the_sequence() {
        let parsed = parse("frobnicate ; nop");
        assert_eq!(parsed.len(), 2);
        assert!(parsed[0].is_err());
        assert!(parsed[1].is_ok());
    }

    #[test]
    fn fullscreen_defaults_to_toggle() {
        assert_eq!(
            one("fullscreen").ops[0],
            Op::Fullscreen { arg: ToggleArg::Toggle, global: false }
        );
        assert_eq!(
            one("fullscreen enable global").ops[0],
            Op::Fullscreen { arg: ToggleArg::Enable, global: true }
        );
    }
}
