//! Main entry point for paycoind

#![deny(warnings, missing_docs, trivial_casts, unused_qualifications)]
#![forbid(unsafe_code)]

use i18n_embed::DesktopLanguageRequester;

/// Boot paycoind
fn main() {
    paycoind::application::boot(DesktopLanguageRequester::requested_languages());
}
