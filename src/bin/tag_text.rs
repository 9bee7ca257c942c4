use clap::Parser;
use doc_tagger::config::DEFAULT_MODEL_ID;
use doc_tagger::core::keywords::{KeywordConfig, Selection};
use doc_tagger::utils::logger;
use doc_tagger::{KeywordExtractor, MiniLmEmbedder};

const SAMPLE_TEXT: &str = "This text is related to the topic of biology and animals.";

#[derive(Parser)]
#[command(name = "tag-text")]
#[command(about = "Print keyword tags for a piece of text")]
struct Args {
    /// Text to tag
    #[arg(default_value = SAMPLE_TEXT)]
    text: String,

    /// Number of tags to print
    #[arg(long, default_value = "5")]
    top_n: usize,

    /// Longest phrase (in words) considered as a tag
    #[arg(long, default_value = "1")]
    ngram_max: usize,

    /// Enable maximal marginal relevance with this diversity (0.0 - 1.0)
    #[arg(long)]
    diversity: Option<f32>,

    /// Hugging Face model id
    #[arg(long, default_value = DEFAULT_MODEL_ID)]
    model: String,

    /// Print scores next to the tags
    #[arg(long)]
    scores: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let config = KeywordConfig {
        top_n: args.top_n,
        ngram_range: (1, args.ngram_max),
        selection: match args.diversity {
            Some(diversity) => Selection::Mmr { diversity },
            None => Selection::Similarity,
        },
        ..Default::default()
    };

    let embedder = MiniLmEmbedder::load(&args.model)?;
    let extractor = KeywordExtractor::new(embedder, config)?;
    let keywords = extractor.extract(&args.text, args.top_n)?;

    if args.scores {
        for keyword in &keywords {
            println!("{}\t{:.4}", keyword.text, keyword.score);
        }
    } else {
        let tags: Vec<&str> = keywords.iter().map(|k| k.text.as_str()).collect();
        println!("{:?}", tags);
    }
    Ok(())
}
