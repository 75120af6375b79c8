use wk_core::prelude::*;
use wk_session::{LibraryState, MutationPhase};

pub fn results(set: &ResultSet) {
    println!("🔎 {} results for {:?}", set.total, set.query);
    for (i, hit) in set.results.iter().enumerate() {
        println!("{:>3}. {} [{}]", i + 1, hit.title, hit.page_id);
        if let Some(snippet) = hit.snippet.as_deref().filter(|s| !s.is_empty()) {
            println!("     {}", snippet);
        }
    }
}

pub fn article(article: &Article, analysis: Option<&Analysis>) {
    let badge = if article.is_saved() {
        format!("saved #{}", article.id)
    } else {
        "not saved".to_string()
    };
    println!("📄 {} ({})", article.title, badge);
    println!("   {}", article.url);
    if let Some(summary) = &article.summary {
        println!();
        println!("{}", summary);
    }
    if let Some(analysis) = analysis {
        println!();
        println!("Words: {}", analysis.word_count);
        let top: Vec<String> = analysis
            .frequent_words
            .iter()
            .map(|w| format!("{} ({})", w.word, w.count))
            .collect();
        if !top.is_empty() {
            println!("Frequent: {}", top.join(", "));
        }
        if let Some(sentiment) = &analysis.sentiment {
            println!("Sentiment: {}", sentiment.label);
        }
    }
    if !article.notes().is_empty() {
        println!();
        println!("Notes:");
        println!("{}", article.notes());
    }
}

pub fn library(state: &LibraryState) {
    println!(
        "📚 {} saved, page {}/{}",
        state.total,
        state.page,
        state.page_count()
    );
    for article in &state.items {
        println!("{:>5}  {}", article.id, article.title);
    }
    let markers: Vec<String> = state
        .page_markers()
        .iter()
        .map(|m| match m {
            wk_session::PageMarker::Page(n) if *n == state.page => format!("[{}]", n),
            other => other.to_string(),
        })
        .collect();
    println!("{}", markers.join(" "));
}

pub fn mutation(phase: MutationPhase, what: &str) {
    match phase {
        MutationPhase::Committed { id } => println!("✅ {} #{}: done", what, id),
        MutationPhase::RolledBack { id } => println!("↩️ {} #{}: rolled back", what, id),
        MutationPhase::Pending { id } => println!("⏳ {} #{}: still pending", what, id),
        MutationPhase::Idle => println!("Nothing to do"),
    }
}
