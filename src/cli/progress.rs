// src/cli/progress.rs — Terminal progress renderer for generation-by-generation feedback

use crate::optimizer::ProgressEvent;

/// Build a progress callback that writes formatted output to stderr.
///
/// All progress output goes to stderr so stdout remains clean for the result.
/// Returns a closure suitable for `InstructionOptimizer::with_progress()`.
pub fn terminal_progress() -> impl Fn(ProgressEvent) + Send + Sync + 'static {
    move |event| {
        if let Some(line) = format_event(&event) {
            eprintln!("{}", line);
        }
    }
}

/// One event as terminal text. `GenerationEnd` is only logged, not printed.
pub fn format_event(event: &ProgressEvent) -> Option<String> {
    let line = match event {
        ProgressEvent::Started {
            candidates,
            labels,
            rows,
            generations,
        } => format!(
            "[start] {} candidate(s), {} label(s), {} row(s), {} generation(s)",
            candidates, labels, rows, generations,
        ),
        ProgressEvent::GenerationScored {
            generation,
            generations,
            table,
        } => format!("[gen {}/{}] scored\n{}", generation, generations, table.to_string().trim_end()),
        ProgressEvent::Mutated {
            generation,
            mode,
            parent,
            child,
        } => format!("[gen {}] {} {} -> {}", generation, mode, parent, child),
        ProgressEvent::GenerationEnd { .. } => return None,
        ProgressEvent::FinalScored { table } => {
            format!("[final]\n{}", table.to_string().trim_end())
        }
        ProgressEvent::Complete {
            best_id,
            best_accuracy,
            examples_seen,
        } => format!(
            "[done] best={} accuracy={:.3} seen={}",
            best_id, best_accuracy, examples_seen,
        ),
    };
    Some(line)
}
