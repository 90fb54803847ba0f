//! Console front end.
//!
//! Reads cashier commands from stdin, multiplexes them with scanner events,
//! and redraws the cart after every change. Lines are addressed by their
//! 1-based position in the table.

use std::fmt::Write as _;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::api::{CatalogProvider, OrderSubmitter, PaymentProcessor};
use crate::cart::{CartSnapshot, LineId, ScanOutcome};
use crate::checkout::PaymentMode;
use crate::scanner::{self, ScanEvent};
use crate::session::PosSession;

pub const HELP: &str = "\
Commands:
  catalog                  list products
  refresh                  reload the catalog from the backend
  add                      add a blank line
  select <line> <product>  set the product on a line
  qty <line> <n>           set a line's quantity
  remove <line>            remove a line
  scan <code>              apply a product id or barcode
  clear                    remove all lines
  show                     redraw the cart
  checkout <customer>      submit the order
  upi                      show the UPI payment link
  pay <upi|cash>           confirm payment
  ports                    list serial ports
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Show,
    Catalog,
    Refresh,
    Add,
    Select { line: usize, product_id: String },
    Qty { line: usize, quantity: String },
    Remove { line: usize },
    Scan(String),
    Clear,
    Checkout(String),
    Upi,
    Pay(String),
    Ports,
    Quit,
}

fn parse_line_no(arg: Option<&str>) -> Result<usize, String> {
    arg.ok_or("Missing line number")?
        .parse::<usize>()
        .map_err(|_| "Line number must be a positive integer".to_string())
}

impl Command {
    pub fn parse(input: &str) -> Result<Command, String> {
        let input = input.trim();
        let (verb, rest) = input
            .split_once(char::is_whitespace)
            .map(|(v, r)| (v, r.trim()))
            .unwrap_or((input, ""));
        let mut args = rest.split_whitespace();

        let cmd = match verb.to_ascii_lowercase().as_str() {
            "help" | "?" => Command::Help,
            "show" | "" => Command::Show,
            "catalog" => Command::Catalog,
            "refresh" => Command::Refresh,
            "add" => Command::Add,
            "select" => {
                let line = parse_line_no(args.next())?;
                let product_id = args.next().ok_or("Missing product id")?.to_string();
                Command::Select { line, product_id }
            }
            "qty" => {
                let line = parse_line_no(args.next())?;
                let quantity = args.next().ok_or("Missing quantity")?.to_string();
                Command::Qty { line, quantity }
            }
            "remove" | "rm" => Command::Remove {
                line: parse_line_no(args.next())?,
            },
            "scan" => {
                if rest.is_empty() {
                    return Err("Missing code".into());
                }
                Command::Scan(rest.to_string())
            }
            "clear" => Command::Clear,
            // The customer name may contain spaces; validation is the cart's job.
            "checkout" => Command::Checkout(rest.to_string()),
            "upi" => Command::Upi,
            "pay" => Command::Pay(rest.to_string()),
            "ports" => Command::Ports,
            "quit" | "exit" => Command::Quit,
            other => return Err(format!("Unknown command {other:?}; type help")),
        };
        Ok(cmd)
    }
}

/// Render the cart as a text table.
pub fn render(snapshot: &CartSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>3}  {:<24} {:>5} {:>10} {:>10}",
        "#", "Product", "Qty", "Price", "Total"
    );
    for (i, line) in snapshot.line_items.iter().enumerate() {
        let name = line
            .product_name
            .as_deref()
            .unwrap_or("--select product--");
        let _ = writeln!(
            out,
            "{:>3}  {:<24} {:>5} {:>10} {:>10}",
            i + 1,
            name,
            line.quantity,
            line.price_per_unit.to_string(),
            line.line_total.to_string()
        );
    }
    let _ = write!(
        out,
        "{:>45} {:>10}",
        "Grand total:",
        snapshot.grand_total.to_string()
    );
    out
}

/// Outcome of one command: text to print and whether to keep running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub quit: bool,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quit: false,
        }
    }
}

fn line_id<B>(session: &PosSession<B>, position: usize) -> Result<LineId, String>
where
    B: CatalogProvider + OrderSubmitter + PaymentProcessor,
{
    session
        .cart()
        .line_id_at(position)
        .ok_or_else(|| format!("No line {position}"))
}

fn describe_scan(outcome: &ScanOutcome) -> String {
    match outcome {
        ScanOutcome::Added { product_name, .. } => format!("{product_name} added to the cart"),
        ScanOutcome::Merged {
            product_name,
            quantity,
            ..
        } => format!("{product_name} quantity now {quantity}"),
    }
}

fn redraw<B>(session: &PosSession<B>, note: String) -> Reply
where
    B: CatalogProvider + OrderSubmitter + PaymentProcessor,
{
    Reply::text(format!("{note}\n{}", render(&session.snapshot())))
}

/// Execute one command against the session.
pub async fn execute<B>(session: &mut PosSession<B>, cmd: Command) -> Result<Reply, String>
where
    B: CatalogProvider + OrderSubmitter + PaymentProcessor,
{
    match cmd {
        Command::Help => Ok(Reply::text(HELP)),
        Command::Show => Ok(Reply::text(render(&session.snapshot()))),
        Command::Catalog => {
            let catalog = session
                .catalog()
                .current()
                .ok_or("Product catalog is not loaded yet")?;
            let mut out = String::new();
            for e in catalog.entries() {
                let _ = writeln!(
                    out,
                    "{:<10} {:<24} {:>10}",
                    e.product_id,
                    e.product_name,
                    e.price_per_unit.to_string()
                );
            }
            Ok(Reply::text(format!("{}{} products", out, catalog.len())))
        }
        Command::Refresh => {
            let count = session.refresh_catalog().await.map_err(|e| e.to_string())?;
            Ok(Reply::text(format!("Catalog loaded: {count} products")))
        }
        Command::Add => {
            session.cart_mut().add_blank_line().map_err(|e| e.to_string())?;
            Ok(redraw(session, "Line added".into()))
        }
        Command::Select { line, product_id } => {
            let id = line_id(session, line)?;
            session
                .cart_mut()
                .select_product(id, &product_id)
                .map_err(|e| e.to_string())?;
            Ok(redraw(session, format!("Line {line}: {product_id}")))
        }
        Command::Qty { line, quantity } => {
            let id = line_id(session, line)?;
            session
                .cart_mut()
                .set_quantity_input(id, &quantity)
                .map_err(|e| e.to_string())?;
            Ok(redraw(session, format!("Line {line}: quantity {quantity}")))
        }
        Command::Remove { line } => {
            let id = line_id(session, line)?;
            session.cart_mut().remove_line(id).map_err(|e| e.to_string())?;
            Ok(redraw(session, format!("Line {line} removed")))
        }
        Command::Scan(code) => {
            let outcome = session.handle_scan(&code).await.map_err(|e| e.to_string())?;
            Ok(redraw(session, describe_scan(&outcome)))
        }
        Command::Clear => {
            session.cart_mut().clear().map_err(|e| e.to_string())?;
            Ok(redraw(session, "Cart cleared".into()))
        }
        Command::Checkout(customer) => {
            let ticket = session.checkout(&customer).await.map_err(|e| e.to_string())?;
            Ok(Reply::text(format!(
                "Order {} placed for {}: {} {}\nPay with: pay upi | pay cash",
                ticket.order_id,
                ticket.customer_name,
                ticket.grand_total,
                session.config().currency
            )))
        }
        Command::Upi => {
            let uri = session.upi_uri().map_err(|e| e.to_string())?;
            Ok(Reply::text(format!("Scan to pay: {uri}")))
        }
        Command::Pay(mode) => {
            let mode = mode.parse::<PaymentMode>().map_err(|e| e.to_string())?;
            let receipt = session.pay(mode).await.map_err(|e| e.to_string())?;
            Ok(Reply::text(receipt.message))
        }
        Command::Ports => {
            let ports = scanner::list_ports().map_err(|e| e.to_string())?;
            if ports.is_empty() {
                return Ok(Reply::text("No serial ports found"));
            }
            let text = ports
                .iter()
                .map(|p| format!("{} ({})", p.name, p.port_type))
                .collect::<Vec<_>>()
                .join("\n");
            Ok(Reply::text(text))
        }
        Command::Quit => Ok(Reply {
            text: "Bye".into(),
            quit: true,
        }),
    }
}

/// Main event loop: stdin commands and scanner events, one at a time.
pub async fn run<B>(
    session: &mut PosSession<B>,
    mut scans: Option<mpsc::Receiver<ScanEvent>>,
) -> std::io::Result<()>
where
    B: CatalogProvider + OrderSubmitter + PaymentProcessor,
{
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", render(&session.snapshot()));

    loop {
        let reply = tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("stdin closed");
                    break;
                };
                match Command::parse(&line) {
                    Ok(cmd) => execute(session, cmd).await,
                    Err(e) => Err(e),
                }
            }
            Some(event) = async {
                match scans.as_mut() {
                    Some(rx) => rx.recv().await,
                    None => std::future::pending().await,
                }
            } => {
                execute(session, Command::Scan(event.code)).await
            }
        };

        match reply {
            Ok(reply) => {
                println!("{}", reply.text);
                if reply.quit {
                    break;
                }
            }
            Err(message) => {
                warn!(message = %message, "Command failed");
                println!("! {message}");
            }
        }
    }
    Ok(())
}
