//! User-facing message texts

use crate::state_machine::state::Direction;

pub const WELCOME: &str = "👋 Welcome to the File Converter Bot!\n\n\
I can help you convert files between Word and PDF formats.\n\
Please select one of the options below:\n";

pub const HELP: &str = "🔍 Help Information\n\n\
Available commands:\n\
/start - Start the bot and show conversion options\n\
/help - Show this help message\n\n\
To convert a file:\n\
1. Click /start\n\
2. Choose the conversion type\n\
3. Send your file when prompted\n\n\
Supported formats:\n\
• Word (.doc, .docx)\n\
• PDF (.pdf)";

pub const NUDGE: &str = "Please use /start to see the available file conversion options, \
or /help for more information about how to use this bot.";

pub const NO_PENDING_DIRECTION: &str = "❌ Please use /start first to select a conversion type.";

pub const CONVERTING: &str = "⚙️ Converting your file... Please wait.";

pub const FILE_NOT_FOUND: &str =
    "❌ Error: The file could not be processed. Please try uploading again.";

pub const PROCESSING_ERROR: &str =
    "❌ Sorry, there was an error processing your file. Please try again.";

/// Prompt sent after a direction is selected
pub fn upload_prompt(direction: Direction) -> &'static str {
    match direction {
        Direction::WordToPdf => {
            "📤 Please send me the Word document (.doc or .docx) you want to convert to PDF."
        }
        Direction::PdfToWord => "📤 Please send me the PDF file you want to convert to Word format.",
    }
}

/// Rejection for an upload whose extension does not fit the pending direction
pub fn invalid_file(direction: Direction) -> &'static str {
    match direction {
        Direction::WordToPdf => "❌ Please send a valid Word document (.doc or .docx)",
        Direction::PdfToWord => "❌ Please send a valid PDF file",
    }
}

/// Caption of the converted document
pub fn result_caption(direction: Direction) -> &'static str {
    match direction {
        Direction::WordToPdf => "✅ Here's your converted PDF file!",
        Direction::PdfToWord => "✅ Here's your converted Word document!",
    }
}
