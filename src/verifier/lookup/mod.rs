// minidkim – implementation of the DKIM specification
// Copyright © 2022–2023 David Bürgin <dbuergin@gluet.ch>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later
// version.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.

#[cfg(feature = "hickory-resolver")]
mod hickory_resolver;

use std::io;

/// A trait for entities that perform DNS TXT record lookups.
///
/// Any closure `Fn(&str) -> Option<String>` is a `LookupTxt`, answering
/// `None` when no record exists.
pub trait LookupTxt {
    /// Looks up the domain’s TXT record in DNS.
    ///
    /// The domain is passed in A-label (ASCII) form with a trailing dot (eg
    /// `selector._domainkey.example.com.`). The answer is the record’s
    /// character strings concatenated, or `None` if there is no record.
    fn lookup_txt(&self, domain: &str) -> io::Result<Option<String>>;
}

impl<F> LookupTxt for F
where
    F: Fn(&str) -> Option<String>,
{
    fn lookup_txt(&self, domain: &str) -> io::Result<Option<String>> {
        Ok(self(domain))
    }
}
