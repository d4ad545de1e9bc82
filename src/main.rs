use std::fs;
use std::io::{self, BufRead, Read, Write};

use anyhow::{Context, Result, anyhow, bail};

use exprtree::ast::Statement;
use exprtree::backend::{self, vm};
use exprtree::parser;
use exprtree::session::{DEMO, Outcome, Session};

struct Options {
    backend: String,
    vars: bool,
    trace: bool,
    demo: bool,
    input: Option<String>,
}

fn parse_args() -> Result<Options> {
    let mut args = std::env::args().skip(1);
    let mut options = Options {
        backend: "interpreter".to_string(),
        vars: false,
        trace: false,
        demo: false,
        input: None,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--backend" | "-b" => {
                options.backend = args
                    .next()
                    .ok_or_else(|| anyhow!("Missing backend name after {arg}"))?;
            }
            "--vars" => options.vars = true,
            "--trace" => options.trace = true,
            "--demo" => options.demo = true,
            flag if flag.starts_with("--") => bail!("Unknown option '{flag}'"),
            _ => {
                if options.input.is_some() {
                    bail!("Only one input file is supported");
                }
                options.input = Some(arg);
            }
        }
    }
    Ok(options)
}

fn main() -> Result<()> {
    let options = parse_args()?;
    let backend = backend::backend(&options.backend)
        .ok_or_else(|| anyhow!("Unknown backend '{}'", options.backend))?;
    let mut session = Session::new(backend);

    if options.demo {
        return run_demo(&mut session, &options);
    }
    match options.input.as_deref() {
        Some(path) => {
            let source = if path == "-" {
                let mut buffer = String::new();
                io::stdin()
                    .read_to_string(&mut buffer)
                    .context("Reading stdin")?;
                buffer
            } else {
                fs::read_to_string(path).with_context(|| format!("Reading {path}"))?
            };
            run_script(&mut session, &source, &options)
        }
        None => repl(&mut session, &options),
    }
}

fn run_script(session: &mut Session, source: &str, options: &Options) -> Result<()> {
    for (index, line) in source.lines().enumerate() {
        let outcome = run_line(session, line, options)
            .with_context(|| format!("Line {}: {}", index + 1, line.trim()))?;
        if outcome != Outcome::Nothing {
            println!("{outcome}");
        }
    }
    Ok(())
}

fn run_demo(session: &mut Session, options: &Options) -> Result<()> {
    for line in DEMO.lines() {
        match run_line(session, line, options)? {
            Outcome::Nothing => {}
            Outcome::Evaluated(evaluation) => println!("{line}: {}", evaluation.value),
            outcome => println!("{outcome}"),
        }
    }
    Ok(())
}

fn repl(session: &mut Session, options: &Options) -> Result<()> {
    println!("Use an empty line to quit.");
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut line = String::new();
    loop {
        print!("> ");
        io::stdout().flush().context("Flushing stdout")?;

        line.clear();
        if input.read_line(&mut line).context("Reading stdin")? == 0 {
            break;
        }
        if line.trim().is_empty() {
            break;
        }
        match run_line(session, &line, options) {
            Ok(Outcome::Nothing) => {}
            Ok(outcome) => println!("{outcome}"),
            Err(err) => eprintln!("Error: {err:#}"),
        }
    }
    Ok(())
}

/// Executes one line, printing diagnostics, the trace and the variable dump
/// around it as requested. The outcome itself is left to the caller.
fn run_line(session: &mut Session, line: &str, options: &Options) -> Result<Outcome> {
    if options.trace {
        trace(session, line);
    }
    let outcome = session.execute(line)?;
    if let Outcome::Evaluated(evaluation) = &outcome {
        for diagnostic in &evaluation.diagnostics {
            eprintln!("{diagnostic}");
        }
    }
    if options.vars && outcome != Outcome::Nothing {
        eprintln!("{}", session.context().globals);
    }
    Ok(outcome)
}

fn trace(session: &mut Session, line: &str) {
    let Ok(Statement::Expr(expr)) = parser::parse(line, &session.context().functions) else {
        return;
    };
    eprintln!("tree: {expr}");
    if session.backend_name() == "vm" {
        let context = session.context_mut();
        let program = vm::compile(&expr, &mut context.globals, &context.functions);
        eprint!("{program}");
    }
}
