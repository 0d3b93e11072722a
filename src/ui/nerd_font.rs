/// Curated NerdFont icons used in crxsync status output.
///
/// A hand-picked subset rather than a full icon crate: consistent in style
/// and well-supported across nerd font implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NerdFont {
    // Status and feedback
    Check,       // 
    CrossCircle, // 
    Warning,     // 
    Info,        // 

    // Files and folders
    Folder, // 
    File,   // 
    Trash,  // 

    // Operations
    Download, // 
    Refresh,  // 
    Package,  // 
    Globe,    // 
}

impl From<NerdFont> for char {
    fn from(icon: NerdFont) -> char {
        match icon {
            NerdFont::Check => '\u{f00c}',       // fa-check
            NerdFont::CrossCircle => '\u{f057}', // fa-times-circle
            NerdFont::Warning => '\u{f071}',     // fa-exclamation-triangle
            NerdFont::Info => '\u{f05a}',        // fa-info-circle
            NerdFont::Folder => '\u{f07b}',      // fa-folder
            NerdFont::File => '\u{f15b}',        // fa-file
            NerdFont::Trash => '\u{f1f8}',       // fa-trash
            NerdFont::Download => '\u{f019}',    // fa-download
            NerdFont::Refresh => '\u{f021}',     // fa-refresh
            NerdFont::Package => '\u{f187}',     // fa-archive
            NerdFont::Globe => '\u{f0ac}',       // fa-globe
        }
    }
}
