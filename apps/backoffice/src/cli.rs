//! # Argument Parsing
//!
//! One optional `--config <path>` followed by a single command.

use std::collections::HashMap;
use std::path::PathBuf;

use thiserror::Error;

use market_core::{Money, NewCustomer, NewProduct};
use market_db::ExportKind;

/// Products generated by `market seed` when no count is given.
pub const DEFAULT_SEED_COUNT: usize = 20;

pub const USAGE: &str = "\
Market back-office

Usage: market [--config <PATH>] <COMMAND>

Commands:
  seed [COUNT]                          Insert demo products and customers
  order <CUSTOMER> <PRODUCT> <QUANTITY> Fulfil one order
  resend [LIMIT]                        Retry undelivered confirmations
  export <products|customers|orders> <PATH>
                                        Write a table as CSV
  product add --title <T> --price <9.99> --quantity <N> [--description <D>]
  product list [--all]                  Active products, or every product
  product update <ID> [--price <P>] [--quantity <N>]
  product deactivate <ID>
  customer add --first-name <F> --last-name <L> --email <E>
               [--phone <P>] [--address <A>]
  customer list
  customer update <ID> [--phone <P>] [--address <A>] [--email <E>]
  help                                  Show this message

Options:
  -c, --config <PATH>   Config file (default: market.toml in the config dir)
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Seed { count: usize },
    Order { customer_id: i64, product_id: i64, quantity: i64 },
    Resend { limit: Option<u32> },
    Export { kind: ExportKind, path: PathBuf },
    Product(ProductCommand),
    Customer(CustomerCommand),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductCommand {
    Add(NewProduct),
    List { include_inactive: bool },
    /// At least one of the two is set.
    Update {
        id: i64,
        price_cents: Option<i64>,
        quantity: Option<i64>,
    },
    Deactivate { id: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerCommand {
    Add(NewCustomer),
    List,
    /// Fields left out keep their stored value.
    Update {
        id: i64,
        phone: Option<String>,
        address: Option<String>,
        email: Option<String>,
    },
}

/// What the arguments asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Help,
    Run(Cli),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cli {
    pub config: Option<PathBuf>,
    pub command: Command,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("missing command")]
    MissingCommand,

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("missing argument <{0}>")]
    MissingArgument(&'static str),

    #[error("invalid value for <{name}>: '{value}'")]
    InvalidArgument { name: &'static str, value: String },

    #[error("unexpected argument '{0}'")]
    UnexpectedArgument(String),

    #[error("unknown option '--{0}'")]
    UnknownOption(String),

    #[error("option '--{0}' needs a value")]
    MissingValue(String),

    #[error("nothing to update, pass at least one of {0}")]
    NothingToUpdate(&'static str),
}

impl Cli {
    pub fn parse(args: &[String]) -> Result<Invocation, CliError> {
        let mut config = None;
        let mut rest = Vec::new();

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "-c" | "--config" => {
                    let path = args
                        .get(i + 1)
                        .ok_or(CliError::MissingArgument("config path"))?;
                    config = Some(PathBuf::from(path));
                    i += 1;
                }
                "-h" | "--help" => rest.push("help".to_string()),
                other => rest.push(other.to_string()),
            }
            i += 1;
        }

        let mut words = rest.into_iter();
        let name = words.next().ok_or(CliError::MissingCommand)?;

        let command = match name.as_str() {
            "seed" => Command::Seed {
                count: optional(words.next(), "count")?.unwrap_or(DEFAULT_SEED_COUNT),
            },
            "order" => Command::Order {
                customer_id: required(words.next(), "customer")?,
                product_id: required(words.next(), "product")?,
                quantity: required(words.next(), "quantity")?,
            },
            "resend" => Command::Resend {
                limit: optional(words.next(), "limit")?,
            },
            "export" => {
                let kind = words.next().ok_or(CliError::MissingArgument("kind"))?;
                let kind = kind
                    .parse::<ExportKind>()
                    .map_err(|_| CliError::InvalidArgument { name: "kind", value: kind })?;
                let path = words.next().ok_or(CliError::MissingArgument("path"))?;
                Command::Export {
                    kind,
                    path: PathBuf::from(path),
                }
            }
            "product" => Command::Product(parse_product(&mut words)?),
            "customer" => Command::Customer(parse_customer(&mut words)?),
            "help" => return Ok(Invocation::Help),
            other => return Err(CliError::UnknownCommand(other.to_string())),
        };

        if let Some(extra) = words.next() {
            return Err(CliError::UnexpectedArgument(extra));
        }

        Ok(Invocation::Run(Cli { config, command }))
    }
}

fn parse_product(words: &mut impl Iterator<Item = String>) -> Result<ProductCommand, CliError> {
    let action = words.next().ok_or(CliError::MissingArgument("action"))?;
    let mut opts = Options::collect(words, &["all"])?;

    let command = match action.as_str() {
        "add" => ProductCommand::Add(NewProduct {
            title: opts.required("title")?,
            description: opts.take("description").unwrap_or_default(),
            price_cents: price(opts.required("price")?)?,
            quantity: required(opts.take("quantity"), "quantity")?,
        }),
        "list" => ProductCommand::List {
            include_inactive: opts.switch("all"),
        },
        "update" => {
            let id = required(opts.positional(), "id")?;
            let price_cents = opts.take("price").map(price).transpose()?;
            let quantity = optional(opts.take("quantity"), "quantity")?;
            if price_cents.is_none() && quantity.is_none() {
                return Err(CliError::NothingToUpdate("--price, --quantity"));
            }
            ProductCommand::Update {
                id,
                price_cents,
                quantity,
            }
        }
        "deactivate" => ProductCommand::Deactivate {
            id: required(opts.positional(), "id")?,
        },
        other => {
            return Err(CliError::InvalidArgument {
                name: "action",
                value: other.to_string(),
            })
        }
    };

    opts.finish()?;
    Ok(command)
}

fn parse_customer(words: &mut impl Iterator<Item = String>) -> Result<CustomerCommand, CliError> {
    let action = words.next().ok_or(CliError::MissingArgument("action"))?;
    let mut opts = Options::collect(words, &[])?;

    let command = match action.as_str() {
        "add" => CustomerCommand::Add(NewCustomer {
            first_name: opts.required("first-name")?,
            last_name: opts.required("last-name")?,
            phone: opts.take("phone").unwrap_or_default(),
            address: opts.take("address").unwrap_or_default(),
            email: opts.required("email")?,
        }),
        "list" => CustomerCommand::List,
        "update" => {
            let id = required(opts.positional(), "id")?;
            let (phone, address, email) =
                (opts.take("phone"), opts.take("address"), opts.take("email"));
            if phone.is_none() && address.is_none() && email.is_none() {
                return Err(CliError::NothingToUpdate("--phone, --address, --email"));
            }
            CustomerCommand::Update {
                id,
                phone,
                address,
                email,
            }
        }
        other => {
            return Err(CliError::InvalidArgument {
                name: "action",
                value: other.to_string(),
            })
        }
    };

    opts.finish()?;
    Ok(command)
}

fn price(value: String) -> Result<i64, CliError> {
    Money::parse_decimal(&value)
        .map(|money| money.cents())
        .ok_or(CliError::InvalidArgument {
            name: "price",
            value,
        })
}

/// Words after an entity action: bare positionals, `--name value` options
/// and value-less switches.
struct Options {
    positional: Vec<String>,
    named: HashMap<String, String>,
    switches: Vec<String>,
}

impl Options {
    fn collect(
        words: &mut impl Iterator<Item = String>,
        switches: &[&str],
    ) -> Result<Self, CliError> {
        let mut opts = Options {
            positional: Vec::new(),
            named: HashMap::new(),
            switches: Vec::new(),
        };

        while let Some(word) = words.next() {
            match word.strip_prefix("--").map(str::to_string) {
                Some(name) if switches.contains(&name.as_str()) => opts.switches.push(name),
                Some(name) => {
                    let value = words
                        .next()
                        .ok_or_else(|| CliError::MissingValue(name.clone()))?;
                    opts.named.insert(name, value);
                }
                None => opts.positional.push(word),
            }
        }

        opts.positional.reverse();
        Ok(opts)
    }

    fn positional(&mut self) -> Option<String> {
        self.positional.pop()
    }

    fn take(&mut self, name: &str) -> Option<String> {
        self.named.remove(name)
    }

    fn required(&mut self, name: &'static str) -> Result<String, CliError> {
        self.take(name).ok_or(CliError::MissingArgument(name))
    }

    fn switch(&mut self, name: &str) -> bool {
        let before = self.switches.len();
        self.switches.retain(|s| s != name);
        self.switches.len() != before
    }

    /// Anything not consumed is an error.
    fn finish(mut self) -> Result<(), CliError> {
        if let Some(extra) = self.positional.pop() {
            return Err(CliError::UnexpectedArgument(extra));
        }
        if let Some(name) = self.named.into_keys().next() {
            return Err(CliError::UnknownOption(name));
        }
        if let Some(name) = self.switches.pop() {
            return Err(CliError::UnexpectedArgument(format!("--{name}")));
        }
        Ok(())
    }
}

fn required<T: std::str::FromStr>(value: Option<String>, name: &'static str) -> Result<T, CliError> {
    optional(value, name)?.ok_or(CliError::MissingArgument(name))
}

fn optional<T: std::str::FromStr>(
    value: Option<String>,
    name: &'static str,
) -> Result<Option<T>, CliError> {
    value
        .map(|v| {
            v.parse::<T>()
                .map_err(|_| CliError::InvalidArgument { name, value: v })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(String::from).collect()
    }

    fn parse(line: &str) -> Cli {
        match Cli::parse(&args(line)).unwrap() {
            Invocation::Run(cli) => cli,
            Invocation::Help => panic!("unexpected help for '{line}'"),
        }
    }

    #[test]
    fn test_order_command() {
        let cli = parse("order 1 2 3");
        assert_eq!(cli.config, None);
        assert_eq!(
            cli.command,
            Command::Order {
                customer_id: 1,
                product_id: 2,
                quantity: 3
            }
        );
    }

    #[test]
    fn test_config_flag_anywhere() {
        let cli = parse("resend 5 --config ./shop.toml");
        assert_eq!(cli.config, Some(PathBuf::from("./shop.toml")));
        assert_eq!(cli.command, Command::Resend { limit: Some(5) });
    }

    #[test]
    fn test_defaults() {
        assert_eq!(
            parse("seed").command,
            Command::Seed { count: DEFAULT_SEED_COUNT }
        );
        assert_eq!(
            parse("resend").command,
            Command::Resend { limit: None }
        );
    }

    #[test]
    fn test_export_command() {
        let cli = parse("export Orders out/orders.csv");
        assert_eq!(
            cli.command,
            Command::Export {
                kind: ExportKind::Orders,
                path: PathBuf::from("out/orders.csv")
            }
        );
    }

    #[test]
    fn test_help() {
        assert_eq!(Cli::parse(&args("--help")), Ok(Invocation::Help));
        assert_eq!(Cli::parse(&args("help")), Ok(Invocation::Help));
    }

    #[test]
    fn test_errors() {
        assert_eq!(Cli::parse(&[]), Err(CliError::MissingCommand));
        assert_eq!(
            Cli::parse(&args("refund 1")),
            Err(CliError::UnknownCommand("refund".to_string()))
        );
        assert_eq!(
            Cli::parse(&args("order 1 2")),
            Err(CliError::MissingArgument("quantity"))
        );
        assert_eq!(
            Cli::parse(&args("order 1 two 3")),
            Err(CliError::InvalidArgument {
                name: "product",
                value: "two".to_string()
            })
        );
        assert!(matches!(
            Cli::parse(&args("export invoices x.csv")),
            Err(CliError::InvalidArgument { name: "kind", .. })
        ));
        assert_eq!(
            Cli::parse(&args("seed 3 4")),
            Err(CliError::UnexpectedArgument("4".to_string()))
        );
    }

    #[test]
    fn test_product_add() {
        let cli = parse("product add --title Beans --price 9.99 --quantity 5");
        assert_eq!(
            cli.command,
            Command::Product(ProductCommand::Add(NewProduct {
                title: "Beans".to_string(),
                description: String::new(),
                price_cents: 999,
                quantity: 5,
            }))
        );
    }

    #[test]
    fn test_product_actions() {
        assert_eq!(
            parse("product list --all").command,
            Command::Product(ProductCommand::List {
                include_inactive: true
            })
        );
        assert_eq!(
            parse("product update 4 --price 12").command,
            Command::Product(ProductCommand::Update {
                id: 4,
                price_cents: Some(1_200),
                quantity: None
            })
        );
        assert_eq!(
            parse("product deactivate 4").command,
            Command::Product(ProductCommand::Deactivate { id: 4 })
        );
    }

    #[test]
    fn test_customer_commands() {
        let cli = parse("customer add --first-name Ada --last-name Lovelace --email ada@example.com");
        match cli.command {
            Command::Customer(CustomerCommand::Add(customer)) => {
                assert_eq!(customer.first_name, "Ada");
                assert_eq!(customer.email, "ada@example.com");
                assert!(customer.phone.is_empty());
            }
            other => panic!("unexpected command: {other:?}"),
        }

        assert_eq!(
            parse("customer update 2 --phone 555-0199").command,
            Command::Customer(CustomerCommand::Update {
                id: 2,
                phone: Some("555-0199".to_string()),
                address: None,
                email: None
            })
        );
        assert_eq!(
            parse("customer list").command,
            Command::Customer(CustomerCommand::List)
        );
    }

    #[test]
    fn test_entity_errors() {
        assert_eq!(
            Cli::parse(&args("product add --title Beans --quantity 5")),
            Err(CliError::MissingArgument("price"))
        );
        assert_eq!(
            Cli::parse(&args("product add --title Beans --price 9.999 --quantity 5")),
            Err(CliError::InvalidArgument {
                name: "price",
                value: "9.999".to_string()
            })
        );
        assert_eq!(
            Cli::parse(&args("product update 4")),
            Err(CliError::NothingToUpdate("--price, --quantity"))
        );
        assert_eq!(
            Cli::parse(&args("product list --colour red")),
            Err(CliError::UnknownOption("colour".to_string()))
        );
        assert_eq!(
            Cli::parse(&args("customer update 2 --email")),
            Err(CliError::MissingValue("email".to_string()))
        );
        assert!(matches!(
            Cli::parse(&args("customer remove 2")),
            Err(CliError::InvalidArgument { name: "action", .. })
        ));
    }
}
