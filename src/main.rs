use clap::{Parser, Subcommand, ValueEnum};
use folio::config::{self, AppConfig};
use folio::document::PageField;
use folio::imaging::extract_capture_year;
use folio::output;
use folio::persistence::{FileBridge, Outcome, RecentState};
use folio::render;
use folio::session::{Session, SessionOptions};
use folio::theme::{ThemeField, ThemeOverrides};
use folio::types::IdentityForm;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Assemble an art portfolio and print it to PDF")]
#[command(long_about = "\
Assemble an art portfolio and print it to PDF

A portfolio is one JSON file holding the artist's details, a theme and an
ordered list of pages. Images are embedded, so the file is self-contained.

Page kinds:

  cover          Name, years, statement and links. Always page 1 once set.
  single         One image with title, year and description.
  series-cover   Introduces a project: title, year, description, image count.
  series-image   One image of a project, shown as \"Image 2 of 5\".

Pages are addressed by their 1-based position as shown by 'folio show'.
The capture year of added JPEGs is read from their EXIF data.

Commands that change the portfolio save it afterwards. Without --portfolio
the last portfolio used is opened.

Run 'folio gen-config' to generate a documented folio.toml.")]
#[command(version)]
struct Cli {
    /// Portfolio file (defaults to the last one used)
    #[arg(long, global = true)]
    portfolio: Option<PathBuf>,

    /// Directory holding folio.toml and recent.json
    #[arg(long, default_value = ".folio", global = true)]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Default)]
struct IdentityArgs {
    #[arg(long)]
    name: Option<String>,
    /// Active years, e.g. "2014 – present"
    #[arg(long)]
    years: Option<String>,
    #[arg(long)]
    statement: Option<String>,
    /// Social profile URL
    #[arg(long)]
    instagram: Option<String>,
    #[arg(long)]
    username: Option<String>,
    #[arg(long)]
    email: Option<String>,
    /// Theme preset: default, default-dark or classic
    #[arg(long)]
    preset: Option<String>,
}

impl IdentityArgs {
    fn is_empty(&self) -> bool {
        [
            &self.name,
            &self.years,
            &self.statement,
            &self.instagram,
            &self.username,
            &self.email,
            &self.preset,
        ]
        .iter()
        .all(|f| f.is_none())
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ThemeFieldArg {
    Paper,
    Text,
    Muted,
    FontFamily,
    FontSize,
}

impl From<ThemeFieldArg> for ThemeField {
    fn from(arg: ThemeFieldArg) -> Self {
        match arg {
            ThemeFieldArg::Paper => ThemeField::Paper,
            ThemeFieldArg::Text => ThemeField::Text,
            ThemeFieldArg::Muted => ThemeField::Muted,
            ThemeFieldArg::FontFamily => ThemeField::FontFamily,
            ThemeFieldArg::FontSize => ThemeField::BodyFontSize,
        }
    }
}

#[derive(clap::Args)]
struct ThemeArgs {
    /// Switch preset (drops customizations of the current one)
    #[arg(long)]
    preset: Option<String>,
    #[arg(long)]
    paper: Option<String>,
    #[arg(long)]
    text: Option<String>,
    #[arg(long)]
    muted: Option<String>,
    #[arg(long)]
    font_family: Option<String>,
    /// Base font size in px, clamped to 8-32
    #[arg(long)]
    font_size: Option<String>,
    /// Restore fields to the preset default
    #[arg(long, value_enum)]
    reset: Vec<ThemeFieldArg>,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new, empty portfolio file
    New,
    /// List the portfolio's pages
    Show,
    /// Show or set the artist's details (creates the cover page)
    Identity(IdentityArgs),
    /// Add one single page per image (files or directories)
    Add {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Add a series: a cover followed by its image pages
    AddSeries {
        title: String,
        #[arg(long, default_value = "")]
        year: String,
        #[arg(long, default_value = "")]
        desc: String,
        /// Number of image pages (defaults to the number of images given)
        #[arg(long)]
        count: Option<usize>,
        /// Images filled into the series pages in order
        images: Vec<PathBuf>,
    },
    /// Put an image on a page
    Attach { page: usize, file: PathBuf },
    /// Edit a text field (name, years, statement, username, email, label, title, year, desc)
    Edit {
        page: usize,
        field: PageField,
        value: String,
    },
    /// Exchange two pages
    Swap { a: usize, b: usize },
    /// Delete a page
    Delete {
        page: usize,
        /// Delete a series cover together with its images
        #[arg(long)]
        series: bool,
    },
    /// Show or change the portfolio theme
    Theme(ThemeArgs),
    /// Write the portfolio as a single HTML file
    Render {
        #[arg(long)]
        out: PathBuf,
    },
    /// Print the portfolio to PDF with the configured print command
    Export {
        #[arg(long)]
        out: PathBuf,
    },
    /// Print the EXIF capture year of image files
    Year {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Show or change preferences
    Prefs {
        #[arg(long)]
        autosave: Option<bool>,
        #[arg(long)]
        ui_dark: Option<bool>,
    },
    /// Print a stock folio.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("folio=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            return Ok(());
        }
        Command::Year { files } => {
            for file in files {
                let bytes = std::fs::read(file)?;
                let year = extract_capture_year(&bytes);
                println!("{}", output::format_year(file, year.as_deref()));
            }
            return Ok(());
        }
        Command::Prefs { autosave, ui_dark } => {
            let mut app_config = config::load_config(&cli.config_dir)?;
            if autosave.is_some() || ui_dark.is_some() {
                let prefs = &mut app_config.preferences;
                prefs.autosave = autosave.unwrap_or(prefs.autosave);
                prefs.ui_dark = ui_dark.unwrap_or(prefs.ui_dark);
                config::save_preferences(&cli.config_dir, prefs)?;
            }
            output::print_preferences(&app_config);
            return Ok(());
        }
        _ => {}
    }

    let app_config = config::load_config(&cli.config_dir)?;
    let mut recent = RecentState::load(&cli.config_dir);
    let bridge = FileBridge::new(std::env::current_dir()?, app_config.export.clone());
    let mut session = Session::new(bridge, SessionOptions::from_config(&app_config))?;
    let events = session.subscribe();

    if let Command::New = cli.command {
        if let Some(path) = &cli.portfolio {
            session.bridge_mut().set_save_target(path);
        }
        if let Outcome::Completed(path) = session.new_document()? {
            println!("Created {}", path.display());
        }
    } else {
        open_portfolio(&mut session, cli.portfolio.as_deref(), &recent)?;
        let changed = run(&mut session, cli.command, &app_config)?;
        if changed {
            session.wait_for_pending();
            session.save()?;
        }
    }

    for event in events.try_iter() {
        if let Some(line) = output::format_event(&event) {
            println!("{}", line);
        }
    }

    if let Some(path) = session.path() {
        let path = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf());
        recent.last_portfolio_path = Some(path);
    }
    recent.has_run = true;
    recent.save(&cli.config_dir)?;
    Ok(())
}

fn open_portfolio(
    session: &mut Session<FileBridge>,
    explicit: Option<&Path>,
    recent: &RecentState,
) -> Result<(), Box<dyn std::error::Error>> {
    match explicit {
        Some(path) => session.open_at(path)?,
        None => {
            if !session.restore_recent(recent) {
                return Err("no portfolio open; pass --portfolio or run 'folio new'".into());
            }
        }
    }
    Ok(())
}

/// Convert a 1-based page position to an index.
fn page_index(position: usize) -> Result<usize, Box<dyn std::error::Error>> {
    position
        .checked_sub(1)
        .ok_or_else(|| "pages are numbered from 1".into())
}

/// Run one command against the open portfolio. Returns whether it changed.
fn run(
    session: &mut Session<FileBridge>,
    command: Command,
    app_config: &AppConfig,
) -> Result<bool, Box<dyn std::error::Error>> {
    match command {
        Command::Show => {
            output::print_document(session.document());
            Ok(false)
        }
        Command::Identity(args) => {
            if args.is_empty() {
                output::print_identity(session.document().identity());
                return Ok(false);
            }
            let current = session.document().identity().clone();
            session.apply_identity_form(IdentityForm {
                name: args.name.unwrap_or(current.name),
                years: args.years.unwrap_or(current.years),
                statement: args.statement.unwrap_or(current.statement),
                instagram: args.instagram.unwrap_or(current.instagram),
                username: args.username.unwrap_or(current.username),
                email: args.email.unwrap_or(current.email),
                preset: args.preset,
            });
            output::print_identity(session.document().identity());
            Ok(true)
        }
        Command::Add { paths } => {
            session.bridge_mut().set_image_sources(paths);
            match session.add_images_from_dialog()? {
                Outcome::Completed(ids) => {
                    println!("Added {} pages", ids.len());
                    Ok(true)
                }
                Outcome::Canceled => {
                    println!("No images found");
                    Ok(false)
                }
            }
        }
        Command::AddSeries {
            title,
            year,
            desc,
            count,
            images,
        } => {
            let (_, pages) =
                session.append_series_with_images(&title, &year, &desc, count, &images);
            println!("Added series '{title}' with {} images", pages.len());
            Ok(true)
        }
        Command::Attach { page, file } => {
            session.attach_image(page_index(page)?, &file)?;
            Ok(true)
        }
        Command::Edit { page, field, value } => {
            session.edit_field(page_index(page)?, field, &value)?;
            Ok(true)
        }
        Command::Swap { a, b } => {
            session.swap(page_index(a)?, page_index(b)?)?;
            Ok(true)
        }
        Command::Delete { page, series } => {
            let index = page_index(page)?;
            let removed = if series {
                session.delete_series(index)?.len()
            } else {
                session.delete_page(index)?;
                1
            };
            println!("Deleted {removed} pages");
            Ok(true)
        }
        Command::Theme(args) => {
            let mut changed = false;
            if let Some(preset) = &args.preset {
                session.set_theme_preset(preset);
                changed = true;
            }
            let overrides = ThemeOverrides {
                paper: args.paper,
                text: args.text,
                muted: args.muted,
                font_family: args.font_family,
                body_font_size: args.font_size,
            };
            if !overrides.is_empty() {
                session.customize_theme(&overrides);
                changed = true;
            }
            for field in args.reset {
                session.reset_theme_field(field.into());
                changed = true;
            }
            output::print_theme(session.document().identity());
            Ok(changed)
        }
        Command::Render { out } => {
            session.wait_for_pending();
            let html = render::render_document(session.document(), app_config.export.page_size);
            std::fs::write(&out, html)?;
            println!("Rendered {}", out.display());
            Ok(false)
        }
        Command::Export { out } => {
            session.bridge_mut().set_export_target(out);
            if let Outcome::Completed(path) = session.export()? {
                println!("Exported {}", path.display());
            }
            Ok(false)
        }
        Command::New | Command::Year { .. } | Command::Prefs { .. } | Command::GenConfig => {
            Ok(false)
        }
    }
}
