/*! # `nekobooru`

The tag and search engine behind a self-hosted media gallery.

## Purpose

Posts (images, GIFs, and videos) are identified by the sha256 of their bytes and found through tags. This crate handles the two tricky parts of that:

- **Tag resolution**: turning whatever a user typed into an upload form into tag ids. Names are normalized, aliases are followed (one hop), missing tags are created, and implied tags are added (one hop). Usage counts stay exact, even with many uploads at once.
- **Search**: compiling a query like `cat -dog width:>500 safety:safe` into a boolean predicate, then running it against the database with a stable sort and 1-indexed pages.

HTTP routing, uploads, thumbnails, and file storage live elsewhere.

## Query language

- `cat`: has the tag `cat`
- `-dog`: doesn't have the tag `dog`
- `cat OR dog`: has either
- `key:value`, `-key:value`: filters. Keys are `rating`/`safety`, `width`, `height` (these two take `>`, `<`, `>=`, `<=`), `fav`/`favorite`, `pool`, `type` (`image`, `gif`, `video`), and `sort`.

Everything else is ANDed together.
*/

pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod search;
pub mod tags;
