//! Subcommands
//!
//! Each command reads from the given input, writes its result to the given
//! output and returns a [`CliError`] on failure, so the binary and the tests
//! drive them the same way.

use crate::config::CinderConfig;
use crate::errors::{CliError, CliResult};
use cinder_core::{hex, BLAKE2B_MAX_OUTPUT, BLAKE2S_MAX_OUTPUT, NONCE_SIZE, XNONCE_SIZE};
use cinder_crypto::{
    verify_password, Aead, AeadCipher, Blake2, Blake2bParams, Blake2sParams, ChaCha20,
    HashSession, Hkdf, Pbkdf2, StoredHash, Variant, XChaCha20,
};
use cinder_random::{FastRandom, ShuffleBag};
use clap::{Subcommand, ValueEnum};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Top-level subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// BLAKE2 digest of a file or stdin
    Hash {
        /// Hash variant
        #[arg(long, value_enum, default_value_t = HashVariant::B)]
        variant: HashVariant,

        /// MAC key in hex
        #[arg(long)]
        key: Option<String>,

        /// Digest length in bytes (defaults to the variant's maximum)
        #[arg(long)]
        length: Option<usize>,

        /// Input file; stdin when omitted
        file: Option<PathBuf>,
    },

    /// Encrypt a file; the output is ciphertext followed by the tag
    Encrypt(AeadArgs),

    /// Authenticate and decrypt a file produced by `encrypt`
    Decrypt(AeadArgs),

    /// Hash or verify account passwords (the password is read from stdin)
    Password {
        #[command(subcommand)]
        action: PasswordAction,
    },

    /// Derive key material from a secret
    Derive {
        /// Derivation function
        #[arg(long, value_enum)]
        kdf: KdfKind,

        /// Secret in hex
        #[arg(long)]
        secret: String,

        /// Salt in hex
        #[arg(long)]
        salt: Option<String>,

        /// PBKDF2 iterations (defaults to the configured work factor)
        #[arg(long)]
        iterations: Option<u32>,

        /// Output length in bytes
        #[arg(long)]
        length: usize,
    },

    /// Print a reproducible shuffle of the given items
    Shuffle {
        /// Generator seed
        #[arg(long)]
        seed: u64,

        /// Generator stream
        #[arg(long)]
        stream: Option<u64>,

        /// Items to shuffle
        #[arg(required = true)]
        items: Vec<String>,
    },

    /// Write a configuration file with default values
    GenerateConfig {
        /// Destination path
        path: PathBuf,
    },
}

/// BLAKE2 variant
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashVariant {
    /// BLAKE2b (64-bit words, up to 64-byte digests)
    B,
    /// BLAKE2s (32-bit words, up to 32-byte digests)
    S,
}

/// Key derivation function
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum KdfKind {
    Pbkdf2,
    Hkdf,
}

/// Arguments shared by encrypt and decrypt
#[derive(clap::Args, Debug)]
pub struct AeadArgs {
    /// 32-byte key in hex
    #[arg(long)]
    pub key: String,

    /// 12-byte (ChaCha20-Poly1305) or 24-byte (XChaCha20-Poly1305) nonce in hex
    #[arg(long)]
    pub nonce: String,

    /// Additional authenticated data
    #[arg(long, default_value = "")]
    pub aad: String,

    /// Input file
    pub input: PathBuf,

    /// Output file
    pub output: PathBuf,
}

/// Password subcommands
#[derive(Subcommand, Debug)]
pub enum PasswordAction {
    /// Print the stored form of a new password
    Hash {
        /// Account name
        #[arg(long)]
        user: String,
    },

    /// Check a password against a stored hash
    Verify {
        /// Account name
        #[arg(long)]
        user: String,

        /// Stored hash as printed by `password hash`
        #[arg(long)]
        stored: String,
    },
}

/// Run one command
///
/// # Arguments
/// * `command` - Parsed subcommand
/// * `config` - Loaded configuration
/// * `input` - Standard input (hash without a file, passwords)
/// * `out` - Standard output
pub fn run<R: BufRead, W: Write>(
    command: Command,
    config: &CinderConfig,
    input: &mut R,
    out: &mut W,
) -> CliResult<()> {
    match command {
        Command::Hash {
            variant,
            key,
            length,
            file,
        } => {
            let key = decode_optional(key.as_deref())?;
            let (digest, label) = match &file {
                Some(path) => {
                    let mut reader = BufReader::new(File::open(path)?);
                    let digest = hash_reader(variant, &key, length, &mut reader)?;
                    (digest, path.display().to_string())
                }
                None => (hash_reader(variant, &key, length, input)?, "-".to_string()),
            };
            writeln!(out, "{}  {}", hex::encode(&digest), label)?;
        }
        Command::Encrypt(args) => {
            let bytes = encrypt_file(&args, config)?;
            info!("Encrypted {} bytes into {}", bytes, args.output.display());
        }
        Command::Decrypt(args) => {
            let bytes = decrypt_file(&args, config)?;
            info!("Decrypted {} bytes into {}", bytes, args.output.display());
        }
        Command::Password { action } => {
            let password = read_password(input)?;
            match action {
                PasswordAction::Hash { user } => {
                    let stored = config.password.hash(&user, &password)?;
                    writeln!(out, "{stored}")?;
                }
                PasswordAction::Verify { user, stored } => {
                    let stored: StoredHash = stored.trim().parse()?;
                    if !verify_password(&user, &password, &stored) {
                        return Err(CliError::VerificationFailed);
                    }
                    writeln!(out, "OK")?;
                }
            }
        }
        Command::Derive {
            kdf,
            secret,
            salt,
            iterations,
            length,
        } => {
            let secret = hex::decode(&secret)?;
            let salt = decode_optional(salt.as_deref())?;
            let iterations = iterations.unwrap_or(config.password.work_factor);
            let derived = derive(kdf, &secret, &salt, iterations, length)?;
            writeln!(out, "{}", hex::encode(&derived))?;
        }
        Command::Shuffle {
            seed,
            stream,
            items,
        } => {
            let rng = match stream {
                Some(stream) => FastRandom::new(seed, stream),
                None => FastRandom::with_seed(seed),
            };
            for item in shuffle(items, rng)? {
                writeln!(out, "{item}")?;
            }
        }
        Command::GenerateConfig { path } => {
            CinderConfig::default().save_to_file(&path)?;
            writeln!(out, "Generated sample configuration at: {}", path.display())?;
        }
    }

    Ok(())
}

// =============================================================================
// HASH
// =============================================================================

/// BLAKE2 digest of everything `reader` yields
pub fn hash_reader<R: Read>(
    variant: HashVariant,
    key: &[u8],
    length: Option<usize>,
    reader: &mut R,
) -> CliResult<Vec<u8>> {
    match variant {
        HashVariant::B => {
            digest_with::<Blake2bParams, R>(key, length.unwrap_or(BLAKE2B_MAX_OUTPUT), reader)
        }
        HashVariant::S => {
            digest_with::<Blake2sParams, R>(key, length.unwrap_or(BLAKE2S_MAX_OUTPUT), reader)
        }
    }
}

fn digest_with<V: Variant, R: Read>(
    key: &[u8],
    length: usize,
    reader: &mut R,
) -> CliResult<Vec<u8>> {
    let mut session = Blake2::<V>::with_key(key, length)?;
    let bytes = session.ingest_reader(reader)?;
    debug!(algorithm = session.name(), bytes, "Hashed input");
    Ok(session.finalize())
}

// =============================================================================
// AEAD
// =============================================================================

/// Encrypt `args.input` into `args.output`
///
/// # Returns
/// Number of plaintext bytes processed
pub fn encrypt_file(args: &AeadArgs, config: &CinderConfig) -> CliResult<u64> {
    let key = hex::decode(&args.key)?;
    let nonce = hex::decode(&args.nonce)?;
    ensure_distinct(&args.input, &args.output)?;
    let plaintext_len = std::fs::metadata(&args.input)?.len();

    let mut reader = BufReader::new(File::open(&args.input)?);
    let mut writer = BufWriter::new(File::create(&args.output)?);
    let chunk_size = config.stream.chunk_size;

    match nonce.len() {
        NONCE_SIZE => {
            let aead = Aead::<ChaCha20>::new(&key)?.with_chunk_size(chunk_size)?;
            aead.encrypt_stream(&nonce, args.aad.as_bytes(), &mut reader, &mut writer)?;
        }
        XNONCE_SIZE => {
            let aead = Aead::<XChaCha20>::new(&key)?.with_chunk_size(chunk_size)?;
            aead.encrypt_stream(&nonce, args.aad.as_bytes(), &mut reader, &mut writer)?;
        }
        other => return Err(bad_nonce(other)),
    }

    Ok(plaintext_len)
}

/// Authenticate and decrypt `args.input` into `args.output`
///
/// The output file is removed again if authentication fails.
///
/// # Returns
/// Number of plaintext bytes written
pub fn decrypt_file(args: &AeadArgs, config: &CinderConfig) -> CliResult<u64> {
    let key = hex::decode(&args.key)?;
    let nonce = hex::decode(&args.nonce)?;
    ensure_distinct(&args.input, &args.output)?;
    match nonce.len() {
        NONCE_SIZE => decrypt_with::<ChaCha20>(args, &key, &nonce, config.stream.chunk_size),
        XNONCE_SIZE => decrypt_with::<XChaCha20>(args, &key, &nonce, config.stream.chunk_size),
        other => Err(bad_nonce(other)),
    }
}

fn decrypt_with<C: AeadCipher>(
    args: &AeadArgs,
    key: &[u8],
    nonce: &[u8],
    chunk_size: usize,
) -> CliResult<u64> {
    let aead = Aead::<C>::new(key)?.with_chunk_size(chunk_size)?;
    let mut source = BufReader::new(File::open(&args.input)?);

    let result = open_output(&args.output).and_then(|mut writer| {
        let written =
            aead.decrypt_stream(nonce, args.aad.as_bytes(), &mut source, &mut writer)?;
        Ok(written)
    });

    if result.is_err() {
        if let Err(e) = std::fs::remove_file(&args.output) {
            warn!("Could not remove {}: {}", args.output.display(), e);
        }
    }
    result
}

/// Reject an output that resolves to the input file
///
/// Creating the output truncates it, so the same file on both sides would
/// lose the input before it is read.
fn ensure_distinct(input: &Path, output: &Path) -> CliResult<()> {
    let input = std::fs::canonicalize(input)?;
    let output = match std::fs::canonicalize(output) {
        Ok(path) => path,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    if input == output {
        return Err(CliError::InvalidArgument(format!(
            "input and output are the same file: {}",
            input.display()
        )));
    }
    Ok(())
}

fn open_output(path: &Path) -> CliResult<BufWriter<File>> {
    Ok(BufWriter::new(File::create(path)?))
}

fn bad_nonce(len: usize) -> CliError {
    CliError::InvalidArgument(format!(
        "nonce must be {NONCE_SIZE} or {XNONCE_SIZE} bytes, got {len}"
    ))
}

// =============================================================================
// PASSWORD / DERIVE / SHUFFLE
// =============================================================================

/// First line of `input`, without its line ending
fn read_password<R: BufRead>(input: &mut R) -> CliResult<String> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    let trimmed = line.trim_end_matches(&['\n', '\r'][..]).len();
    line.truncate(trimmed);
    Ok(line)
}

/// Derive `length` bytes with keyed-BLAKE2b PBKDF2 or BLAKE2b HKDF
///
/// For HKDF a non-empty salt first extracts a pseudo-random key from the
/// secret; an empty salt expands the secret directly.
pub fn derive(
    kdf: KdfKind,
    secret: &[u8],
    salt: &[u8],
    iterations: u32,
    length: usize,
) -> CliResult<Vec<u8>> {
    let derived = match kdf {
        KdfKind::Pbkdf2 => Pbkdf2::with_blake2b(secret, salt, iterations)?.get_bytes(length)?,
        KdfKind::Hkdf if salt.is_empty() => Hkdf::with_blake2b(secret)?.get_bytes(length)?,
        KdfKind::Hkdf => {
            let prk = Hkdf::extract(salt, secret)?;
            Hkdf::with_blake2b(&prk)?.get_bytes(length)?
        }
    };
    Ok(derived)
}

/// Draw every item through a [`ShuffleBag`] and check that undoing the
/// shuffle restores the input
///
/// # Returns
/// The items in draw order
pub fn shuffle(items: Vec<String>, rng: FastRandom) -> CliResult<Vec<String>> {
    let original = items.clone();
    let mut items = items;

    let mut bag = ShuffleBag::new(&mut items, rng)?;
    let order = bag.drain_order();
    bag.reset(true);
    if bag.items() != original.as_slice() {
        return Err(CliError::UnshuffleMismatch);
    }

    debug!(count = order.len(), "Shuffle verified");
    Ok(order)
}

fn decode_optional(text: Option<&str>) -> CliResult<Vec<u8>> {
    Ok(text.map(hex::decode).transpose()?.unwrap_or_default())
}
